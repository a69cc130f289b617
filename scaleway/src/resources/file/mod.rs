pub mod resource_filesystem;

pub use resource_filesystem::FilesystemResource;

pub mod resource_namespace;

pub use resource_namespace::RegistryNamespaceResource;

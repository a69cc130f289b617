mod common;

use common::{error_summaries, for_create, meta, object, FakeMnq};
use mockito::{Matcher, Server};
use scaleway::resources::function::{DomainResource, FunctionResource};
use scaleway::skeleton::{Managed, ScalewayResource};
use serde_json::json;
use tfplug::{AttributePath, Context, Dynamic};

const NAMESPACE_ID: &str = "88888888-8888-8888-8888-888888888888";
const FUNCTION_ID: &str = "99999999-9999-9999-9999-999999999999";
const DOMAIN_ID: &str = "aaaaaaaa-aaaa-aaaa-aaaa-aaaaaaaaaaaa";
const FUNCTIONS: &str = "/functions/v1beta1/regions/fr-par/functions";

fn function_body(status: &str) -> String {
    json!({
        "id": FUNCTION_ID,
        "name": "thumbnails",
        "namespace_id": NAMESPACE_ID,
        "status": status,
        "runtime": "node18",
        "handler": "handler.handle",
        "privacy": "public",
        "min_scale": 0,
        "max_scale": 5,
        "memory_limit": 256,
        "timeout": "300s",
        "domain_name": "thumbnails-abc.functions.fnc.fr-par.scw.cloud",
        "runtime_message": "node18 reaches end of support soon"
    })
    .to_string()
}

fn archive() -> String {
    let path = std::env::temp_dir().join(format!("thumbnails-{}.zip", std::process::id()));
    std::fs::write(&path, b"PK\x05\x06zip").unwrap();
    path.to_string_lossy().into_owned()
}

#[tokio::test]
async fn function_create_uploads_deploys_and_warns_on_runtime() {
    let mut server = Server::new_async().await;
    let zip_file = archive();

    let create = server
        .mock("POST", FUNCTIONS)
        .match_body(Matcher::PartialJson(json!({
            "name": "thumbnails",
            "namespace_id": NAMESPACE_ID,
            "runtime": "node18"
        })))
        .with_status(200)
        .with_body(function_body("created"))
        .expect(1)
        .create_async()
        .await;
    let _get = server
        .mock("GET", format!("{}/{}", FUNCTIONS, FUNCTION_ID).as_str())
        .with_status(200)
        .with_body(function_body("ready"))
        .create_async()
        .await;
    let upload_url = server
        .mock("GET", format!("{}/{}/upload-url", FUNCTIONS, FUNCTION_ID).as_str())
        .match_query(Matcher::UrlEncoded("content_length".into(), "7".into()))
        .with_status(200)
        .with_body(
            json!({
                "url": format!("{}/bucket/{}.zip?signature=abc", server.url(), FUNCTION_ID),
                "headers": {"content-type": ["application/octet-stream"]}
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;
    let upload = server
        .mock("PUT", format!("/bucket/{}.zip", FUNCTION_ID).as_str())
        .match_query(Matcher::Any)
        .match_header("content-type", "application/octet-stream")
        .match_body(Matcher::Exact("PK\x05\x06zip".to_string()))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let deploy = server
        .mock("POST", format!("{}/{}/deploy", FUNCTIONS, FUNCTION_ID).as_str())
        .with_status(200)
        .with_body(function_body("pending"))
        .expect(1)
        .create_async()
        .await;

    let functions = Managed::with_meta(FunctionResource, meta(&server.url(), &FakeMnq::new()));
    let mut data = for_create(
        FunctionResource::TYPE_NAME,
        object(vec![
            ("name", Dynamic::from("thumbnails")),
            ("namespace_id", Dynamic::from(NAMESPACE_ID)),
            ("runtime", Dynamic::from("node18")),
            ("handler", Dynamic::from("handler.handle")),
            ("privacy", Dynamic::from("public")),
            ("zip_file", Dynamic::from(zip_file.as_str())),
            ("deploy", Dynamic::Bool(true)),
        ]),
    );
    let diagnostics = functions.create_data(&Context::new(), &mut data).await;
    std::fs::remove_file(&zip_file).ok();

    assert!(!diagnostics.has_errors(), "{:?}", error_summaries(&diagnostics));
    create.assert_async().await;
    upload_url.assert_async().await;
    upload.assert_async().await;
    deploy.assert_async().await;

    let runtime: Vec<_> = diagnostics
        .warnings()
        .filter(|d| d.attribute == Some(AttributePath::new("runtime")))
        .collect();
    assert_eq!(runtime.len(), 1);
    assert_eq!(runtime[0].detail, "node18 reaches end of support soon");

    assert_eq!(data.id(), format!("fr-par/{}", FUNCTION_ID));
    assert_eq!(
        data.get_string("domain_name"),
        Some("thumbnails-abc.functions.fnc.fr-par.scw.cloud".to_string())
    );
    assert_eq!(data.get_string("status"), Some("ready".to_string()));
}

#[tokio::test]
async fn function_without_archive_skips_upload_and_deploy() {
    let mut server = Server::new_async().await;
    let _create = server
        .mock("POST", FUNCTIONS)
        .with_status(200)
        .with_body(function_body("created"))
        .create_async()
        .await;
    let _get = server
        .mock("GET", format!("{}/{}", FUNCTIONS, FUNCTION_ID).as_str())
        .with_status(200)
        .with_body(function_body("created"))
        .create_async()
        .await;
    let upload_url = server
        .mock("GET", format!("{}/{}/upload-url", FUNCTIONS, FUNCTION_ID).as_str())
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;
    let deploy = server
        .mock("POST", format!("{}/{}/deploy", FUNCTIONS, FUNCTION_ID).as_str())
        .expect(0)
        .create_async()
        .await;

    let functions = Managed::with_meta(FunctionResource, meta(&server.url(), &FakeMnq::new()));
    let mut data = for_create(
        FunctionResource::TYPE_NAME,
        object(vec![
            ("name", Dynamic::from("thumbnails")),
            ("namespace_id", Dynamic::from(NAMESPACE_ID)),
            ("runtime", Dynamic::from("node18")),
            ("privacy", Dynamic::from("public")),
            ("deploy", Dynamic::Bool(true)),
        ]),
    );
    let diagnostics = functions.create_data(&Context::new(), &mut data).await;

    assert!(!diagnostics.has_errors(), "{:?}", error_summaries(&diagnostics));
    upload_url.assert_async().await;
    deploy.assert_async().await;
    assert_eq!(data.get_string("status"), Some("created".to_string()));
}

fn domain_body(status: &str) -> String {
    json!({
        "id": DOMAIN_ID,
        "hostname": "img.example.com",
        "function_id": FUNCTION_ID,
        "url": "https://img.example.com",
        "status": status
    })
    .to_string()
}

#[tokio::test]
async fn domain_create_waits_for_dns_validation() {
    let mut server = Server::new_async().await;
    let not_validated = server
        .mock("POST", "/functions/v1beta1/regions/fr-par/domains")
        .with_status(400)
        .with_body(
            json!({
                "type": "invalid_arguments",
                "message": "could not validate domain img.example.com: CNAME not found"
            })
            .to_string(),
        )
        .expect(2)
        .create_async()
        .await;
    let accepted = server
        .mock("POST", "/functions/v1beta1/regions/fr-par/domains")
        .match_body(Matcher::Json(json!({
            "hostname": "img.example.com",
            "function_id": FUNCTION_ID
        })))
        .with_status(200)
        .with_body(domain_body("pending"))
        .expect(1)
        .create_async()
        .await;
    let _get = server
        .mock("GET", format!("/functions/v1beta1/regions/fr-par/domains/{}", DOMAIN_ID).as_str())
        .with_status(200)
        .with_body(domain_body("ready"))
        .create_async()
        .await;

    let domains = Managed::with_meta(DomainResource, meta(&server.url(), &FakeMnq::new()));
    let mut data = for_create(
        DomainResource::TYPE_NAME,
        object(vec![
            ("function_id", Dynamic::from(format!("fr-par/{}", FUNCTION_ID))),
            ("hostname", Dynamic::from("img.example.com")),
        ]),
    );
    let diagnostics = domains.create_data(&Context::new(), &mut data).await;

    assert!(!diagnostics.has_errors(), "{:?}", error_summaries(&diagnostics));
    not_validated.assert_async().await;
    accepted.assert_async().await;
    assert_eq!(data.id(), format!("fr-par/{}", DOMAIN_ID));
    assert_eq!(data.get_string("url"), Some("https://img.example.com".to_string()));
    assert_eq!(
        data.get_string("function_id"),
        Some(format!("fr-par/{}", FUNCTION_ID))
    );
}

#[tokio::test]
async fn domain_create_stops_on_other_errors() {
    let mut server = Server::new_async().await;
    let refused = server
        .mock("POST", "/functions/v1beta1/regions/fr-par/domains")
        .with_status(400)
        .with_body(r#"{"type":"invalid_arguments","message":"hostname is already in use"}"#)
        .expect(1)
        .create_async()
        .await;

    let domains = Managed::with_meta(DomainResource, meta(&server.url(), &FakeMnq::new()));
    let mut data = for_create(
        DomainResource::TYPE_NAME,
        object(vec![
            ("function_id", Dynamic::from(FUNCTION_ID)),
            ("hostname", Dynamic::from("img.example.com")),
        ]),
    );
    let diagnostics = domains.create_data(&Context::new(), &mut data).await;

    refused.assert_async().await;
    assert_eq!(error_summaries(&diagnostics), vec!["Failed to create function domain"]);
    assert!(data.id().is_empty());
}

//! Provider-wide, read-only state handed to every resource

use std::sync::Arc;
use std::time::Duration;

use tfplug::{Context, ResourceData};

use crate::api::aws::{
    endpoint_for, AwsMnqClientFactory, MnqClientFactory, MnqEndpoint, SnsApi, SqsApi,
    DEFAULT_SNS_ENDPOINT, DEFAULT_SQS_ENDPOINT,
};
use crate::api::Client;
use crate::ids::IdError;
use crate::locality::{Locality, Region, Zone};

const AWS_RETRY_INTERVAL: Duration = Duration::from_secs(5);
const POST_UPDATE_DELAY: Duration = Duration::from_secs(1);

#[derive(Clone)]
pub struct ScalewayProviderData {
    pub client: Client,
    pub access_key: Option<String>,
    pub default_project_id: Option<String>,
    pub default_organization_id: Option<String>,
    pub default_region: Region,
    pub default_zone: Zone,
    /// Poll interval of the waiters; None or zero selects the family default
    pub wait_retry_interval: Option<Duration>,
    /// Interval of the AWS-code and DNS retry loops
    pub aws_retry_interval: Duration,
    /// Pause after updates the backend does not report as transient right away
    pub post_update_delay: Duration,
    pub sqs_endpoint_template: String,
    pub sns_endpoint_template: String,
    pub mnq_clients: Arc<dyn MnqClientFactory>,
}

impl ScalewayProviderData {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            access_key: None,
            default_project_id: None,
            default_organization_id: None,
            default_region: Region::FrPar,
            default_zone: Zone {
                region: Region::FrPar,
                number: 1,
            },
            wait_retry_interval: None,
            aws_retry_interval: AWS_RETRY_INTERVAL,
            post_update_delay: POST_UPDATE_DELAY,
            sqs_endpoint_template: DEFAULT_SQS_ENDPOINT.to_string(),
            sns_endpoint_template: DEFAULT_SNS_ENDPOINT.to_string(),
            mnq_clients: Arc::new(AwsMnqClientFactory),
        }
    }

    /// Copy whose REST client stops retrying once `ctx` is done
    pub fn scoped(&self, ctx: &Context) -> Self {
        Self {
            client: self.client.with_context(ctx),
            ..self.clone()
        }
    }

    /// Region of a resource: explicit `region`, then the ID's first segment, then the default
    pub fn region(&self, data: &ResourceData) -> Result<Region, IdError> {
        if let Some(region) = data.get_string_ok("region") {
            return region.parse();
        }
        match data.id().split_once('/') {
            Some((prefix, _)) => Ok(prefix.parse::<Locality>()?.region()),
            None => Ok(self.default_region),
        }
    }

    /// Zone of a resource: explicit `zone`, then the ID prefix, then the default
    pub fn zone(&self, data: &ResourceData) -> Result<Zone, IdError> {
        if let Some(zone) = data.get_string_ok("zone") {
            return zone.parse();
        }
        match data.id().split_once('/') {
            Some((prefix, _)) => match prefix.parse::<Locality>()? {
                Locality::Zone(zone) => Ok(zone),
                Locality::Region(region) => Err(IdError::InvalidID(format!(
                    "{} is a region, expected a zone",
                    region
                ))),
            },
            None => Ok(self.default_zone),
        }
    }

    /// Explicit `project_id`, falling back to the provider default
    pub fn project_id(&self, data: &ResourceData) -> Option<String> {
        data.get_string_ok("project_id")
            .or_else(|| self.default_project_id.clone())
    }

    /// Explicit `organization_id`, falling back to the provider default
    pub fn organization_id(&self, data: &ResourceData) -> Option<String> {
        data.get_string_ok("organization_id")
            .or_else(|| self.default_organization_id.clone())
    }

    pub fn sqs_client(&self, region: Region, url: Option<&str>, access_key: &str, secret_key: &str) -> Arc<dyn SqsApi> {
        let endpoint = MnqEndpoint {
            region,
            url: url
                .map(str::to_string)
                .unwrap_or_else(|| endpoint_for(&self.sqs_endpoint_template, region)),
            access_key: access_key.to_string(),
            secret_key: secret_key.to_string(),
        };
        self.mnq_clients.sqs(&endpoint)
    }

    pub fn sns_client(&self, region: Region, url: Option<&str>, access_key: &str, secret_key: &str) -> Arc<dyn SnsApi> {
        let endpoint = MnqEndpoint {
            region,
            url: url
                .map(str::to_string)
                .unwrap_or_else(|| endpoint_for(&self.sns_endpoint_template, region)),
            access_key: access_key.to_string(),
            secret_key: secret_key.to_string(),
        };
        self.mnq_clients.sns(&endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::create_test_client;
    use tfplug::{Dynamic, DynamicValue};

    fn data(entries: Vec<(&str, Dynamic)>) -> ResourceData {
        ResourceData::from_state(DynamicValue::new(Dynamic::object(entries)))
    }

    fn meta() -> ScalewayProviderData {
        let mut meta = ScalewayProviderData::new(create_test_client("http://localhost"));
        meta.default_region = Region::NlAms;
        meta.default_project_id = Some("project".to_string());
        meta
    }

    #[test]
    fn region_precedence() {
        let meta = meta();
        let id = "pl-waw/11111111-2222-3333-4444-555555555555";

        assert_eq!(
            meta.region(&data(vec![("region", Dynamic::from("fr-par")), ("id", Dynamic::from(id))]))
                .unwrap(),
            Region::FrPar
        );
        assert_eq!(meta.region(&data(vec![("id", Dynamic::from(id))])).unwrap(), Region::PlWaw);
        assert_eq!(
            meta.region(&data(vec![("id", Dynamic::from("it-mil/project/my-queue"))]))
                .unwrap(),
            Region::ItMil
        );
        assert_eq!(meta.region(&data(vec![])).unwrap(), Region::NlAms);
        assert!(meta.region(&data(vec![("region", Dynamic::from("mars"))])).is_err());
    }

    #[test]
    fn zone_precedence() {
        let meta = meta();
        assert_eq!(
            meta.zone(&data(vec![("id", Dynamic::from("nl-ams-2/abc"))]))
                .unwrap()
                .to_string(),
            "nl-ams-2"
        );
        assert_eq!(meta.zone(&data(vec![])).unwrap().to_string(), "fr-par-1");
    }

    #[test]
    fn project_defaults_to_provider() {
        let meta = meta();
        assert_eq!(meta.project_id(&data(vec![])).as_deref(), Some("project"));
        assert_eq!(
            meta.project_id(&data(vec![("project_id", Dynamic::from("mine"))]))
                .as_deref(),
            Some("mine")
        );
        assert_eq!(meta.organization_id(&data(vec![])), None);
    }
}

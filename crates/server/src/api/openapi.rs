use super::health::HealthResponse;
use super::ingestion::{IngestAlert, IngestResponse};
use super::silence::{CreateSilenceRequest, MatcherDto, SilenceResponse};
use super::status::{ConfigSnapshot, PeerSnapshot, ReceiverSnapshot, StatusResponse};

#[derive(utoipa::OpenApi)]
#[openapi(
    info(
        title = "RelayMux API",
        version = "0.1.0",
        description = "HTTP API for the RelayMux alert routing and notification gateway. Ingest alerts, manage silences, and inspect cluster status.",
        license(name = "Apache-2.0")
    ),
    tags(
        (name = "Health", description = "Service liveness"),
        (name = "Ingestion", description = "Alert ingestion and current alert listing"),
        (name = "Silence", description = "Silence CRUD"),
        (name = "Status", description = "Cluster membership, uptime, and configuration snapshot"),
    ),
    paths(
        super::health::health,
        super::ingestion::post_alerts,
        super::ingestion::list_alerts,
        super::silence::create_silence,
        super::silence::update_silence,
        super::silence::list_silences,
        super::silence::get_silence,
        super::silence::expire_silence,
        super::status::status,
    ),
    components(schemas(
        HealthResponse,
        IngestAlert,
        IngestResponse,
        MatcherDto,
        CreateSilenceRequest,
        SilenceResponse,
        ReceiverSnapshot,
        ConfigSnapshot,
        PeerSnapshot,
        StatusResponse,
    ))
)]
pub struct ApiDoc;

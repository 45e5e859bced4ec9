use std::time::Duration;

use clap::Parser;
use consentry_core::{
    consent::{
        api::LifecycleRequest,
        core::{
            exchange::DEFAULT_EXCHANGE_TIMEOUT_MS, lifecycle::LifecycleService,
            token::DEFAULT_TOKEN_TTL_MS,
        },
        infrastructure::records::now_millis,
        init_consent_manager,
    },
    transport::grpc::{
        C2pGrpc, DEFAULT_GRPC_PORT, P2cHandler, U2cHandler,
        proto::{CONSENTRY_DESCRIPTOR_SET, p2c_server::P2cServer, u2c_server::U2cServer},
    },
};
use tonic::transport::Server;
use tonic_reflection::server::Builder;
use tower::Service;

#[derive(Parser, Debug)]
#[command(name = "consentry_server")]
#[command(about = "Consentry consent manager server")]
struct ConsentryServerArgs {
    /// Server address to bind to
    #[arg(short, long, default_value = "[::1]")]
    address: String,

    /// Server port to bind to
    #[arg(short, long, default_value_t = DEFAULT_GRPC_PORT)]
    port: u16,

    /// Enable gRPC reflection
    #[arg(short, long, default_value_t = false)]
    reflection: bool,

    /// Validity window of issued exchange tokens, in milliseconds
    #[arg(long, default_value_t = DEFAULT_TOKEN_TTL_MS)]
    token_ttl_ms: u64,

    /// Bound on a single outbound connector call, in milliseconds (0 disables)
    #[arg(long, default_value_t = DEFAULT_EXCHANGE_TIMEOUT_MS)]
    exchange_timeout_ms: u64,

    /// Interval of the consent expiry sweep, in seconds (0 disables)
    #[arg(long, default_value_t = 60)]
    expiry_sweep_secs: u64,
}

#[cfg(not(tarpaulin_include))]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(feature = "consentry_tracing")]
    consentry_core::consentry_tracing::init();

    let args = ConsentryServerArgs::parse();

    let address = format!("{}:{}", args.address, args.port).parse()?;

    let (u2c_service, p2c_service, records, notices, _directory) =
        init_consent_manager(args.token_ttl_ms, args.exchange_timeout_ms, C2pGrpc::default());

    // System-triggered expiry: periodically sweep granted records whose
    // validity window elapsed and run them through the state machine.
    if args.expiry_sweep_secs > 0 {
        let mut lifecycle = LifecycleService::new(records.clone(), notices.clone());
        let sweep_records = records.clone();
        let mut ticker = tokio::time::interval(Duration::from_secs(args.expiry_sweep_secs));
        tokio::spawn(async move {
            loop {
                ticker.tick().await;
                let Ok(now) = now_millis() else { continue };
                for id in sweep_records.due_for_expiry(now) {
                    let _ = lifecycle.call(LifecycleRequest::Expire(id)).await;
                }
            }
        });
    }

    let mut server_builder = Server::builder()
        .add_service(U2cServer::new(U2cHandler::new(u2c_service)))
        .add_service(P2cServer::new(P2cHandler::new(p2c_service)));

    if args.reflection {
        let reflection_service = Builder::configure()
            .register_encoded_file_descriptor_set(CONSENTRY_DESCRIPTOR_SET)
            .build_v1()?;
        server_builder = server_builder.add_service(reflection_service);
    }

    server_builder.serve(address).await?;

    Ok(())
}

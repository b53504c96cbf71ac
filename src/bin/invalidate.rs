//! Lambda entry point for the pipeline's invalidate-cache action
//!
//! Built with `cargo lambda build --release --bin sitestack-invalidate` and
//! uploaded to the bucket and key named in the `function` invalidation settings.

use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use sitestack::aws::SdkClient;
use sitestack::trigger::{InvalidationTrigger, InvokeEvent};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<(), Error> {
    // CloudWatch adds its own timestamps
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_ansi(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let trigger = InvalidationTrigger::from_env(SdkClient::from_env().await);
    let trigger = &trigger;

    lambda_runtime::run(service_fn(move |event: LambdaEvent<InvokeEvent>| async move {
        let outcome = trigger.handle(&event.payload).await;
        Ok::<Value, Error>(serde_json::to_value(outcome)?)
    }))
    .await
}

use anyhow::{anyhow, Context};
use futures::StreamExt;
use gosub_xhr::{ClientConfig, CredentialsMode, HttpTransportFactory, RequestConfig, RequestObservable};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://httpbin.org/json".to_string());

    // The client config is shared by every request created from the factory
    let client_cfg = ClientConfig::builder()
        .user_agent("Gosub-XHR-Demo/0.1")
        .timeout(Duration::from_secs(10))
        .build()
        .context("client config is not valid")?;
    let factory = Arc::new(HttpTransportFactory::new(client_cfg)?);

    let request_cfg = RequestConfig::builder()
        .header("Accept", "application/json")
        .credentials(CredentialsMode::Omit)
        .build();

    // Nothing goes over the wire until we subscribe
    let user = RequestObservable::new(url, request_cfg, factory);
    let mut sub = user.subscribe();

    let response = match sub.next().await {
        Some(Ok(response)) => response,
        Some(Err(reason)) => return Err(anyhow!("{}: {}", user.url(), reason.message())),
        None => return Err(anyhow!("{}: request ended without a result", user.url())),
    };

    println!("{} {} ({})", response.status, response.status_text, response.url);
    for (name, value) in &response.headers {
        println!("{name}: {value}");
    }
    println!();

    // Decoding is a stream on its own, just like the request
    let mut json = response.json();
    match json.next().await {
        Some(Ok(value)) => println!("{}", serde_json::to_string_pretty(&value)?),
        Some(Err(e)) => {
            log::warn!("{e}");
            println!("{}", response.body);
        }
        None => {}
    }

    Ok(())
}

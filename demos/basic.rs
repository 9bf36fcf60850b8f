use jsonrest_http::{ClientOptions, Credentials, JsonRestClient, NonSuccessHandling, Retry};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
struct Widget {
    id: u64,
    name: String,
}

#[derive(Serialize)]
struct NewWidget<'a> {
    name: &'a str,
}

#[derive(Serialize)]
struct Search<'a> {
    name: &'a str,
    page: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let base_uri = std::env::var("JSONREST_BASE_URI")?;
    let authentication = match (
        std::env::var("JSONREST_USERNAME"),
        std::env::var("JSONREST_PASSWORD"),
    ) {
        (Ok(username), Ok(password)) => Some(Credentials::new(username, password)?),
        _ => None,
    };

    let client = JsonRestClient::with_options(
        &base_uri,
        ClientOptions {
            authentication,
            non_success_handling: NonSuccessHandling::ThrowError,
            retry_policy: Retry::on(&[429, 502, 503])
                .on_exception()
                .with_exponential_backoff()
                .stop_after(4),
            ..ClientOptions::default()
        },
    )?;

    let created: Widget = client.post("widgets", &NewWidget { name: "Kit" }).await?;
    println!("created {created:?}");

    let found: jsonrest_http::ListResponse<Widget> = client
        .get_with_query("widgets", &Search { name: "Kit", page: 1 })
        .await?;
    for widget in &found {
        println!("{} {}", widget.id, widget.name);
    }

    client
        .delete::<Option<serde_json::Value>>(&format!("widgets/{}", created.id))
        .await?;

    Ok(())
}

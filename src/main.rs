use std::env;

#[tokio::main]
async fn main() {
    sipswp::telemetry::init();

    let raw_args: Vec<String> = env::args().collect();
    if raw_args.get(1).map(|s| s.as_str()) == Some("serve") {
        let port = raw_args
            .get(2)
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(8080);
        if let Err(e) = sipswp::api::run_http_server(port).await {
            eprintln!("Server error: {e}");
            std::process::exit(1);
        }
        return;
    }

    match sipswp::api::run_cli(raw_args) {
        Ok(output) => print!("{output}"),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    }
}

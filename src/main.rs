#[cfg(feature = "ssr")]
#[tokio::main]
async fn main() {
    use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
    use std::sync::Arc;

    use axum::Router;
    use leptos::leptos_config::Env;
    use leptos::*;
    use leptos_axum::{generate_route_list, LeptosRoutes};
    use linkshelf::app::backend::BackendClient;
    use linkshelf::app::*;
    use linkshelf::fileserv::file_and_error_handler;
    use linkshelf::proxy;
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Setting get_configuration(None) means we'll be using cargo-leptos's env values
    let conf = get_configuration(None)
        .await
        .expect("leptos configuration should be readable");
    let mut leptos_options = conf.leptos_options;
    leptos_options.hash_files = true;
    if leptos_options.env == Env::PROD {
        // in the dockerfile, hash.txt will actually be here and not "./hash.txt'
        leptos_options.hash_file = "/app/target/release/hash.txt".to_string();
    }

    let addr = match std::env::var("PORT") {
        Ok(port) => SocketAddr::V4(SocketAddrV4::new(
            Ipv4Addr::UNSPECIFIED,
            port.parse().expect("`PORT` to be an u16"),
        )),
        _ => leptos_options.site_addr,
    };
    let cloned_leptos_options = leptos_options.clone();
    let routes = generate_route_list(App);

    let backend = Arc::new(BackendClient::default());
    tracing::info!(endpoint = backend.endpoint(), "using backend");

    let context_backend = backend.clone();
    let app = Router::new()
        .leptos_routes_with_context(
            &leptos_options,
            routes,
            move || {
                provide_context(context_backend.clone());
                provide_context(cloned_leptos_options.clone());
            },
            App,
        )
        .merge(proxy::routes(backend))
        .fallback(file_and_error_handler)
        .with_state(leptos_options);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|err| panic!("could not bind {addr}: {err}"));
    tracing::info!("listening on http://{}", &addr);
    if let Err(err) = axum::serve(listener, app.into_make_service()).await {
        tracing::error!(%err, "server stopped");
    }
}

#[cfg(not(feature = "ssr"))]
pub fn main() {
    // no client-side main function
    // unless we want this to work with e.g., Trunk for a purely client-side app
    // see lib.rs for hydration function instead
}

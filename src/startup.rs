use std::{net::TcpListener, path::PathBuf, sync::Arc};

use actix_files::Files;
use actix_web::{
    dev::Server,
    middleware::Logger,
    web::{self, Data},
    App, HttpServer,
};

use crate::{
    configuration::Settings,
    dal::blob_store::{BlobStore, FsBlobStore, MemoryBlobStore},
    routes::{default_route, search_route},
    services::{HttpFetcher, Registry, TrademarkSearcher},
};

pub fn build_searcher(configuration: &Settings) -> anyhow::Result<TrademarkSearcher> {
    let registry = Registry::new(&configuration.registry)?;
    let fetcher = HttpFetcher::new(&configuration.registry.user_agent)?;

    let store: Arc<dyn BlobStore> = match &configuration.cache.dir {
        Some(dir) => {
            log::info!("Caching detail pages under {}", dir.display());
            Arc::new(FsBlobStore::new(dir))
        }
        None => {
            log::warn!("No cache directory configured, detail cache will not survive restarts");
            Arc::new(MemoryBlobStore::new())
        }
    };

    Ok(TrademarkSearcher::new(
        registry,
        Arc::new(fetcher),
        store,
        configuration.registry.detail_concurrency,
    ))
}

pub fn api_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(search_route::json_config())
        .service(default_route::health_check)
        .service(web::scope("/api").service(search_route::search));
}

pub fn run(
    listener: TcpListener,
    searcher: TrademarkSearcher,
    static_dir: Option<PathBuf>,
) -> Result<Server, std::io::Error> {
    let searcher = Data::new(searcher);
    let static_dir = static_dir.filter(|dir| dir.is_dir());

    let server = HttpServer::new(move || {
        let app = App::new()
            .wrap(Logger::default())
            .app_data(searcher.clone())
            .configure(api_routes);

        match &static_dir {
            Some(dir) => app.service(
                Files::new("/", dir)
                    .index_file("index.html")
                    .prefer_utf8(true),
            ),
            None => app,
        }
    })
    .listen(listener)?
    .run();

    Ok(server)
}

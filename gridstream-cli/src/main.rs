mod args;
mod backend;
mod surface;

use std::fs::File;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use args::Args;
use backend::SyntheticBackend;
use clap::Parser;
use gridstream_lib::config::{LoaderConfig, PageIndexing, ScrollConfig};
use gridstream_lib::filter::Filter;
use gridstream_lib::loader::{LoadState, Loader};
use gridstream_lib::model::{Record, Value};
use gridstream_lib::scroll::ScrollStrategy;
use gridstream_lib::sort::Sort;
use gridstream_lib::source::DataSource;
use gridstream_lib::viewport::ViewportEvent;
use log::info;
use simplelog::{Config, LevelFilter, WriteLogger};
use surface::MemoryViewport;
use tokio::sync::{mpsc, watch};

/// Everything wired together for one scripted session.
struct Session {
    source: DataSource<Record>,
    strategy: ScrollStrategy,
    loader: Loader<Record>,
    viewport: MemoryViewport,
    events: mpsc::Sender<ViewportEvent>,
    sort: watch::Sender<Sort>,
    row_height: Arc<Mutex<f64>>,
}

impl Session {
    fn new(args: &Args) -> gridstream_lib::Result<Self> {
        let source = DataSource::new(Vec::new());

        let row_height = Arc::new(Mutex::new(args.row_height));
        let height = Arc::clone(&row_height);
        let header = args.header;
        let strategy = ScrollStrategy::new(
            move || height.lock().map(|h| *h).unwrap_or(0.0),
            move || header,
            ScrollConfig::default()
                .with_buffer(args.scroll_buffer)
                .with_reanchor(args.reanchor.into()),
        );

        let viewport = MemoryViewport::new(args.viewport);
        strategy.attach(viewport.clone());
        strategy.bind_data_length(source.filtered_data()?);

        let (events, rx) = mpsc::channel(16);
        strategy.listen(rx);

        let (sort, sort_rx) = watch::channel(Sort::none());
        source.bind_sort(sort_rx);
        source.bind_rendered_range(strategy.rendered_range_stream()?);

        let backend = SyntheticBackend::new(args.rows, Duration::from_millis(args.latency_ms));
        let loader = Loader::new(
            source.clone(),
            backend,
            LoaderConfig::default()
                .with_page_size(args.page_size)
                .with_buffer(args.load_buffer)
                .with_paging(PageIndexing::NextPage),
        );

        Ok(Self {
            source,
            strategy,
            loader,
            viewport,
            events,
            sort,
            row_height,
        })
    }

    async fn send(&self, event: ViewportEvent) {
        if self.events.send(event).await.is_err() {
            info!("Viewport listener is gone");
        }
    }

    /// Waits until the bound streams and the loader have nothing left to do.
    async fn quiesce(&self) {
        let mut states = self.loader.subscribe_state();
        loop {
            tokio::time::sleep(Duration::from_millis(5)).await;
            if states.wait_for(|s| !s.is_pending()).await.is_err() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
            if !self.loader.is_pending() && !self.strategy.has_pending_correction() {
                return;
            }
        }
    }

    /// Drags towards `offset`, letting pages load whenever the end of the content is hit.
    async fn scroll_to(&self, offset: f64) {
        loop {
            let before = self.viewport.offset();
            self.viewport.drag_to(offset);
            self.send(ViewportEvent::Scrolled).await;
            self.quiesce().await;

            let now = self.viewport.offset();
            let at_end = self.viewport.content_size() <= now + self.viewport.size();
            if now == offset || (now == before && at_end) {
                return;
            }
        }
    }

    async fn set_row_height(&self, height: f64) {
        if let Ok(mut h) = self.row_height.lock() {
            *h = height;
        }
        self.send(ViewportEvent::Scrolled).await;
        self.quiesce().await;
    }

    fn print(&self, step: &str) {
        let range = self.viewport.range();
        println!("== {} ==", step);
        println!(
            "loaded {} | filtered {} | range {}..{} | top row {} | offset {:.0}/{:.0}px | draw at {:.0}px | row height {:.0}px",
            self.source.len(),
            self.source.filtered_len(),
            range.start,
            range.end,
            self.strategy.scrolled_index().unwrap_or(0),
            self.viewport.offset(),
            self.viewport.content_size(),
            self.viewport.content_offset(),
            self.strategy.item_height(),
        );
        if let LoadState::Failed(e) = self.loader.state() {
            println!("last load failed: {}", e);
        }
        for (i, row) in self.source.visible().iter().enumerate() {
            println!("{:>5}  {}", range.start + i, describe(row));
        }
        println!();
    }

    fn close(&self) {
        self.loader.stop();
        self.strategy.detach();
        self.source.dispose();
    }
}

fn describe(row: &Record) -> String {
    let field = |path: &str| {
        gridstream_lib::model::resolve_path(row, path)
            .map(|v| match v {
                Value::String(s) => s.clone(),
                Value::Int(n) => n.to_string(),
                other => format!("{:?}", other),
            })
            .unwrap_or_else(|| "-".to_string())
    };
    format!(
        "#{:<5} {:<14} {:<8} score {:>3}",
        field("id"),
        field("name"),
        field("owner.city"),
        field("score")
    )
}

async fn run(args: Args) -> gridstream_lib::Result<()> {
    let session = Session::new(&args)?;
    let loader = session.loader.spawn(session.strategy.rendered_range_stream()?);

    session.quiesce().await;
    session.print("initial load");

    let middle = session.strategy.item_height() * 100.0;
    session.scroll_to(middle).await;
    session.print("scrolled to row 100");

    session.source.set_filter(Filter::new("owner.city", |v| {
        v.and_then(Value::as_str) == Some("Oslo")
    }));
    session.scroll_to(0.0).await;
    session.print("filtered to Oslo");

    session.sort.send_replace(Sort::desc("score"));
    session.quiesce().await;
    session.print("sorted by score, descending");

    session.scroll_to(session.strategy.item_height() * 10.0).await;
    let doubled = session.strategy.item_height() * 2.0;
    session.set_row_height(doubled).await;
    session.print("row height doubled");

    session.source.clear_filters();
    session.quiesce().await;
    session.print("filters cleared");

    session.close();
    if let Err(e) = loader.await {
        info!("Loader task ended abnormally: {}", e);
    }
    info!(
        "Session finished with {} rows loaded over {} page requests",
        session.source.len(),
        session.loader.pages_requested()
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let level = if args.trace {
        LevelFilter::Trace
    } else {
        LevelFilter::Debug
    };
    let log_file = File::create(&args.log_file).expect("Failed to create log file");
    WriteLogger::init(level, Config::default(), log_file).expect("Failed to initialize logger");

    if let Err(e) = run(args).await {
        eprintln!("Error: {}", e);
    }
}

//! In-memory collaborators shared by the harness integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use liquidfn_common::{EventBus, EventKind};
use liquidfn_harness::{
    AssetDeployer, Collaborators, Fetcher, HarnessConfig, PageRef, RenderConfig, TemplateLoader,
};
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

pub const CLEAN: &str = "1.3";
pub const SHELL: &str = "<!doctype html><html><head></head><body>Not found</body></html>";

/// Scripted response for one fetch
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Fail(String),
    Hang,
}

impl Reply {
    pub fn text(s: &str) -> Self {
        Reply::Text(s.to_string())
    }
}

/// Fetcher replaying a fixed script; an exhausted script returns ""
#[derive(Default)]
pub struct ScriptedFetcher {
    replies: Mutex<VecDeque<Reply>>,
    pub urls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            urls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.urls.lock().len()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch_text(&self, url: &str) -> anyhow::Result<String> {
        self.urls.lock().push(url.to_string());
        let reply = self.replies.lock().pop_front();
        match reply {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Fail(msg)) => Err(anyhow::anyhow!(msg)),
            Some(Reply::Hang) => {
                futures::future::pending::<()>().await;
                unreachable!()
            }
            None => Ok(String::new()),
        }
    }
}

#[derive(Debug, Default)]
pub struct DeployLog {
    pub pages: usize,
    pub snippets: Vec<String>,
    pub created: Vec<String>,
    pub templates: Vec<String>,
    pub deleted: Vec<String>,
}

/// Deployer handing out suffixes `t1`, `t2`, … and recording every call
#[derive(Default)]
pub struct RecordingDeployer {
    pub log: Mutex<DeployLog>,
    pub fail_page: bool,
    pub fail_render_target: bool,
    pub fail_delete: HashSet<String>,
}

impl RecordingDeployer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn deleted(&self) -> Vec<String> {
        self.log.lock().deleted.clone()
    }

    pub fn created(&self) -> Vec<String> {
        self.log.lock().created.clone()
    }
}

#[async_trait]
impl AssetDeployer for RecordingDeployer {
    async fn create_page(&self) -> anyhow::Result<PageRef> {
        if self.fail_page {
            anyhow::bail!("page quota exceeded");
        }
        self.log.lock().pages += 1;
        Ok(PageRef {
            id: 42,
            handle: "liquid-fn-test".into(),
        })
    }

    async fn create_snippet(&self, source: &str) -> anyhow::Result<()> {
        self.log.lock().snippets.push(source.to_string());
        Ok(())
    }

    async fn create_render_target(&self, template: &str) -> anyhow::Result<String> {
        if self.fail_render_target {
            anyhow::bail!("asset rejected");
        }
        let mut log = self.log.lock();
        let suffix = format!("t{}", log.created.len() + 1);
        log.created.push(suffix.clone());
        log.templates.push(template.to_string());
        Ok(suffix)
    }

    async fn delete_render_target(&self, suffix: &str) -> anyhow::Result<()> {
        if self.fail_delete.contains(suffix) {
            anyhow::bail!("delete of {suffix} refused");
        }
        self.log.lock().deleted.push(suffix.to_string());
        Ok(())
    }
}

/// Loader returning fixed source, or failing
pub struct StaticLoader(pub Option<String>);

#[async_trait]
impl TemplateLoader for StaticLoader {
    async fn load(&self, entry: &str) -> anyhow::Result<String> {
        match &self.0 {
            Some(source) => Ok(source.clone()),
            None => anyhow::bail!("no such entry: {entry}"),
        }
    }
}

pub fn config() -> HarnessConfig {
    HarnessConfig {
        shop: "demo.myshopify.com".into(),
        render: RenderConfig {
            delay_ms: 0,
            timeout_ms: None,
        },
        ..Default::default()
    }
}

pub fn collaborators(deployer: Arc<RecordingDeployer>, fetcher: Arc<ScriptedFetcher>) -> Collaborators {
    Collaborators {
        deployer,
        fetcher,
        loader: Arc::new(StaticLoader(Some("{{ value | weight }}".into()))),
    }
}

/// Record the kind of every event published on `bus`
pub fn event_log(bus: &EventBus) -> Arc<Mutex<Vec<EventKind>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    bus.subscribe(&EventKind::ALL, move |event| {
        sink.lock().push(event.kind());
        Ok(())
    })
    .unwrap();
    log
}

pub fn count(log: &Mutex<Vec<EventKind>>, kind: EventKind) -> usize {
    log.lock().iter().filter(|k| **k == kind).count()
}

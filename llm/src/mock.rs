use async_trait::async_trait;
use dv_core::{Instructions, ModelGateway, Provider};
use errors::GatewayError;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Scripted reply of a [`MockGateway`].
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    Fail(GatewayError)
}

impl MockReply {
    /// A well-formed response with no issues.
    pub fn clean() -> Self {
        Self::Text(r#"{"issues": []}"#.to_string())
    }
}

struct Script {
    needle: String,
    replies: VecDeque<MockReply>,
    calls: usize
}

/// In-process gateway for tests and offline runs.
///
/// Replies are scripted per needle: the first script whose needle occurs in
/// the rendered prompt or system message answers the call. Queued replies are
/// consumed in order and the last one repeats.
pub struct MockGateway {
    provider: Provider,
    scripts: Mutex<Vec<Script>>,
    fallback: MockReply,
    delay: Duration,
    healthy: bool,
    calls: AtomicUsize
}

impl MockGateway {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            scripts: Mutex::new(Vec::new()),
            fallback: MockReply::clean(),
            delay: Duration::ZERO,
            healthy: true,
            calls: AtomicUsize::new(0)
        }
    }

    /// Reply used when no script matches.
    pub fn with_fallback(mut self, reply: MockReply) -> Self {
        self.fallback = reply;
        self
    }

    /// Queues replies for calls whose prompt contains `needle`.
    pub fn on(self, needle: impl Into<String>, replies: Vec<MockReply>) -> Self {
        if let Ok(mut scripts) = self.scripts.lock() {
            scripts.push(Script {
                needle: needle.into(),
                replies: replies.into(),
                calls: 0
            });
        }
        self
    }

    /// Delay applied before every reply.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    /// Total number of `complete` calls.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of calls answered by the script registered for `needle`.
    pub fn calls_for(&self, needle: &str) -> usize {
        self.scripts
            .lock()
            .map(|scripts| {
                scripts
                    .iter()
                    .filter(|s| s.needle == needle)
                    .map(|s| s.calls)
                    .sum()
            })
            .unwrap_or(0)
    }

    fn next_reply(&self, prompt: &str, system: Option<&str>) -> MockReply {
        let Ok(mut scripts) = self.scripts.lock() else {
            return self.fallback.clone();
        };
        let matched = scripts.iter_mut().find(|s| {
            prompt.contains(&s.needle) || system.is_some_and(|sys| sys.contains(&s.needle))
        });

        match matched {
            Some(script) => {
                script.calls += 1;
                if script.replies.len() > 1 {
                    script.replies.pop_front().unwrap_or_else(|| self.fallback.clone())
                } else {
                    script
                        .replies
                        .front()
                        .cloned()
                        .unwrap_or_else(|| self.fallback.clone())
                }
            }
            None => self.fallback.clone()
        }
    }
}

#[async_trait]
impl ModelGateway for MockGateway {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn complete(
        &self,
        instructions: &Instructions,
        content: &str
    ) -> Result<String, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let prompt = instructions.render(content);
        let reply = self.next_reply(&prompt, instructions.system.as_deref());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match reply {
            MockReply::Text(text) => Ok(text),
            MockReply::Fail(err) => Err(err)
        }
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }
}

use std::time::Duration;

use dashmap::DashMap;

use crate::errors::ChatError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/v1";
pub const DEFAULT_APP_NAME: &str = "Novas";

/// Connection settings for the chat backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the REST API, e.g. `http://localhost:8000/api/v1`.
    pub base_url: String,
    /// Streaming endpoint; `{base_url}/chat-stream` when not set.
    pub stream_url: Option<String>,
    /// Timeout for non-streaming requests.
    pub timeout: Duration,
    /// Fail a send when no chunk arrives for this long.
    pub stream_idle_timeout: Option<Duration>,
    /// Suffix of generated chat titles.
    pub app_name: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            stream_url: None,
            timeout: Duration::from_secs(30),
            stream_idle_timeout: None,
            app_name: DEFAULT_APP_NAME.to_string(),
        }
    }
}

impl ClientConfig {
    /// Reads `NOVAS_API_BASE_URL`, `NOVAS_STREAM_URL` and `NOVAS_HTTP_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ChatError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ChatError> {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();
        if let Some(base_url) = non_empty("NOVAS_API_BASE_URL") {
            config.base_url = base_url;
        }
        config.stream_url = non_empty("NOVAS_STREAM_URL");
        if let Some(raw) = non_empty("NOVAS_HTTP_TIMEOUT_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                ChatError::Config(format!("NOVAS_HTTP_TIMEOUT_SECS must be a number of seconds, got `{raw}`"))
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn stream_url(mut self, stream_url: impl Into<String>) -> Self {
        self.stream_url = Some(stream_url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn stream_idle_timeout(mut self, timeout: Duration) -> Self {
        self.stream_idle_timeout = Some(timeout);
        self
    }

    pub fn app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub(crate) fn chats_url(&self) -> String {
        format!("{}/chats", self.base())
    }

    pub(crate) fn chat_url(&self, chat_id: &str) -> String {
        format!("{}/chats/{chat_id}", self.base())
    }

    pub(crate) fn messages_url(&self, chat_id: &str) -> String {
        format!("{}/chats/{chat_id}/messages", self.base())
    }

    pub(crate) fn config_url(&self) -> String {
        format!("{}/config", self.base())
    }

    pub fn resolved_stream_url(&self) -> String {
        match &self.stream_url {
            Some(url) => url.clone(),
            None => format!("{}/chat-stream", self.base()),
        }
    }
}

pub const AUTO_IMAGE_SEARCH_KEY: &str = "autoImageSearch";
pub const AUTO_VIDEO_SEARCH_KEY: &str = "autoVideoSearch";
pub const SYSTEM_INSTRUCTIONS_KEY: &str = "systemInstructions";
pub const LANGUAGE_KEY: &str = "language";

/// Local client flags, read while a session is configuring.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientSettings {
    pub auto_image_search: bool,
    pub auto_video_search: bool,
    pub system_instructions: Option<String>,
    pub language: Option<String>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            auto_image_search: true,
            auto_video_search: false,
            system_instructions: None,
            language: None,
        }
    }
}

/// String key/value storage for local client flags.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, ChatError>;
    fn set(&self, key: &str, value: &str) -> Result<(), ChatError>;
}

#[derive(Default)]
pub struct MemorySettingsStore {
    values: DashMap<String, String>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self, key: &str) -> Result<Option<String>, ChatError> {
        Ok(self.values.get(key).map(|value| value.clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ChatError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

impl ClientSettings {
    /// Reads the flags, writing defaults for the boolean flags that are absent.
    pub fn load(store: &dyn SettingsStore) -> Result<Self, ChatError> {
        let defaults = Self::default();
        let auto_image_search = load_flag(store, AUTO_IMAGE_SEARCH_KEY, defaults.auto_image_search)?;
        let auto_video_search = load_flag(store, AUTO_VIDEO_SEARCH_KEY, defaults.auto_video_search)?;
        let optional = |key: &str| -> Result<Option<String>, ChatError> {
            Ok(store.get(key)?.filter(|value| !value.trim().is_empty()))
        };
        Ok(Self {
            auto_image_search,
            auto_video_search,
            system_instructions: optional(SYSTEM_INSTRUCTIONS_KEY)?,
            language: optional(LANGUAGE_KEY)?,
        })
    }
}

fn load_flag(store: &dyn SettingsStore, key: &str, default: bool) -> Result<bool, ChatError> {
    match store.get(key)? {
        None => {
            store.set(key, if default { "true" } else { "false" })?;
            Ok(default)
        }
        Some(raw) => match raw.trim() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(ChatError::Config(format!("invalid value `{other}` for {key}"))),
        },
    }
}

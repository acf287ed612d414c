//! MQTT 发布客户端（rumqttc）
//!
//! 事件循环在独立线程上运行，负责连接、保活与断线重连；
//! 每次收到 CONNACK 后调用已注册的连接回调。
//!
//! 发布使用非阻塞的 `try_publish`：连接回调在事件循环线程上执行，
//! 阻塞式发布在请求队列满时会等待事件循环自身，造成死锁。

use crate::error::PublishError;
use crate::publisher::{ConnectCallback, PublishClient};
use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use rumqttc::{Client, ClientError, Connection, Event, MqttOptions, Packet, QoS, Transport};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 请求队列容量
const REQUEST_CAPACITY: usize = 10;

/// 传输安全设置
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsSettings {
    /// 使用系统根证书
    NativeRoots,
    /// 使用指定 CA 证书（PEM）
    CaFile(PathBuf),
}

/// MQTT 连接参数
#[derive(Debug, Clone)]
pub struct MqttSettings {
    pub host: String,
    pub port: u16,
    pub keep_alive: Duration,
    pub client_id: String,
    pub credentials: Option<(String, String)>,
    pub tls: Option<TlsSettings>,
    /// 连接错误后的重试间隔
    pub reconnect_delay: Duration,
}

impl MqttSettings {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            keep_alive: Duration::from_secs(60),
            client_id: format!("liquid2mqtt-{}", std::process::id()),
            credentials: None,
            tls: None,
            reconnect_delay: Duration::from_secs(5),
        }
    }

    pub fn keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// 设置用户名/密码（任一为空时不启用认证）
    pub fn set_credentials(mut self, user: impl Into<String>, pass: impl Into<String>) -> Self {
        let (user, pass) = (user.into(), pass.into());
        self.credentials = if user.is_empty() || pass.is_empty() {
            None
        } else {
            Some((user, pass))
        };
        self
    }

    /// 启用 TLS；`cert_path` 为空时使用系统根证书
    pub fn set_transport_security(mut self, cert_path: Option<PathBuf>) -> Self {
        self.tls = Some(match cert_path {
            Some(path) => TlsSettings::CaFile(path),
            None => TlsSettings::NativeRoots,
        });
        self
    }

    fn to_options(&self) -> Result<MqttOptions, PublishError> {
        let mut options = MqttOptions::new(self.client_id.clone(), self.host.clone(), self.port);
        options.set_keep_alive(self.keep_alive);

        if let Some((user, pass)) = &self.credentials {
            options.set_credentials(user.clone(), pass.clone());
        }

        match &self.tls {
            None => {},
            Some(TlsSettings::NativeRoots) => {
                options.set_transport(Transport::tls_with_default_config());
            },
            Some(TlsSettings::CaFile(path)) => {
                let ca = std::fs::read(path)
                    .map_err(|e| PublishError::Tls(format!("{}: {}", path.display(), e)))?;
                options.set_transport(Transport::tls(ca, None, None));
            },
        }

        Ok(options)
    }
}

struct ConnectHook(ConnectCallback);

/// MQTT 发布客户端
pub struct MqttPublishClient {
    client: Client,
    connection: Mutex<Option<Connection>>,
    hook: Arc<ArcSwapOption<ConnectHook>>,
    host: String,
    reconnect_delay: Duration,
}

impl MqttPublishClient {
    pub fn new(settings: MqttSettings) -> Result<Self, PublishError> {
        let options = settings.to_options()?;
        let (client, connection) = Client::new(options, REQUEST_CAPACITY);

        Ok(Self {
            client,
            connection: Mutex::new(Some(connection)),
            hook: Arc::new(ArcSwapOption::empty()),
            host: format!("{}:{}", settings.host, settings.port),
            reconnect_delay: settings.reconnect_delay,
        })
    }
}

impl PublishClient for MqttPublishClient {
    fn on_connect(&self, callback: ConnectCallback) {
        self.hook.store(Some(Arc::new(ConnectHook(callback))));
    }

    fn connect(&self) -> Result<(), PublishError> {
        let connection = self.connection.lock().take().ok_or_else(|| {
            PublishError::Connection("event loop already running".to_string())
        })?;
        let hook = Arc::clone(&self.hook);
        let host = self.host.clone();
        let delay = self.reconnect_delay;

        thread::Builder::new()
            .name("mqtt-event-loop".to_string())
            .spawn(move || event_loop(connection, hook, host, delay))
            .map_err(|e| PublishError::Connection(e.to_string()))?;

        Ok(())
    }

    fn publish(&self, topic: &str, payload: &str, retain: bool) -> Result<(), PublishError> {
        self.client
            .try_publish(topic, QoS::AtLeastOnce, retain, payload.as_bytes().to_vec())
            .map_err(|e| match e {
                ClientError::TryRequest(_) => PublishError::QueueFull,
                other => PublishError::Client(other.to_string()),
            })
    }
}

/// 事件循环：所有 `Client` 句柄释放后迭代结束
fn event_loop(
    mut connection: Connection,
    hook: Arc<ArcSwapOption<ConnectHook>>,
    host: String,
    reconnect_delay: Duration,
) {
    for notification in connection.iter() {
        match notification {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                info!("Connected to MQTT broker at {}", host);
                if let Some(hook) = hook.load_full() {
                    (hook.0)();
                }
            },
            Ok(event) => {
                debug!("MQTT event: {:?}", event);
            },
            Err(e) => {
                warn!(
                    "MQTT connection error ({}): {}. Retrying in {:?}",
                    host, e, reconnect_delay
                );
                thread::sleep(reconnect_delay);
            },
        }
    }
    debug!("MQTT event loop finished");
}

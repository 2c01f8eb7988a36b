//! Main ECHONET Lite client implementation

use echolite_core::property::{GET_MAP, IDENTIFICATION_NUMBER, MANUFACTURER_CODE, SET_MAP, STATUS_MAP};
use echolite_core::{codec, EchonetObject, Frame, Property, PropertyValue, ServiceCode, INSTANCE_LIST};
use echolite_transport::{DatagramLink, TransportEvent, TransportReceiver};
use futures::Future;
use parking_lot::Mutex;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, trace, warn};

use crate::builder::EchonetClientBuilder;
use crate::callbacks::{self, CallbackRegistry, HandlerFuture, UpdateHandler};
use crate::config::ClientConfig;
use crate::discovery;
use crate::error::Result;
use crate::router::PropertyUpdateRouter;
use crate::state::{DeviceStateTree, InstanceKey, PropertyMap, Snapshot};
use crate::transaction::TransactionRegistry;

/// What processing one inbound datagram did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageReport {
    /// The TID was outstanding when the datagram arrived
    pub correlated: bool,
    /// A tracked property changed and handlers were dispatched
    pub updated: bool,
    /// Handlers that returned an error
    pub handler_failures: usize,
}

/// State touched by both request futures and the receive loop
struct Shared {
    transactions: TransactionRegistry,
    tree: DeviceStateTree,
    callbacks: CallbackRegistry,
}

struct Inner {
    link: Arc<dyn DatagramLink>,
    config: ClientConfig,
    router: PropertyUpdateRouter,
    shared: Mutex<Shared>,
    receiver: Mutex<Option<JoinHandle<()>>>,
}

/// An ECHONET Lite controller
///
/// Cheap to clone; clones share the socket, the transaction registry and
/// the mirrored device state.
#[derive(Clone)]
pub struct EchonetClient {
    inner: Arc<Inner>,
}

impl EchonetClient {
    /// Create a client on top of an existing link (use the builder for more options)
    pub fn new(link: Arc<dyn DatagramLink>, config: ClientConfig) -> Self {
        Self::with_router(link, config, PropertyUpdateRouter::default())
    }

    pub(crate) fn with_router(
        link: Arc<dyn DatagramLink>,
        config: ClientConfig,
        router: PropertyUpdateRouter,
    ) -> Self {
        let shared = Shared {
            transactions: TransactionRegistry::new(config.max_abandoned),
            tree: DeviceStateTree::new(),
            callbacks: CallbackRegistry::new(),
        };
        Self {
            inner: Arc::new(Inner {
                link,
                config,
                router,
                shared: Mutex::new(shared),
                receiver: Mutex::new(None),
            }),
        }
    }

    /// Create a builder
    pub fn builder() -> EchonetClientBuilder {
        EchonetClientBuilder::new()
    }

    /// Bind with the default configuration and start receiving
    pub async fn connect() -> Result<Self> {
        EchonetClientBuilder::new().connect().await
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Send a request and wait for its response
    ///
    /// Returns `Ok(true)` once a response with the same TID has been
    /// processed, `Ok(false)` if none arrived within the response timeout.
    /// Encoding and send failures are returned as errors.
    pub async fn request(
        &self,
        host: IpAddr,
        object: EchonetObject,
        esv: ServiceCode,
        properties: Vec<Property>,
    ) -> Result<bool> {
        let (tid, data, completion) = {
            let mut shared = self.inner.shared.lock();
            shared.tree.ensure_node(host);

            let tid = shared.transactions.allocate();
            let frame = Frame::new(object, esv)
                .with_source(self.inner.config.controller)
                .with_tid(tid.get())
                .with_properties(properties);
            let data = codec::encode(&frame)?;
            let completion = shared.transactions.mark_outstanding(tid);
            (tid, data, completion)
        };

        let target = SocketAddr::new(host, self.inner.config.port);
        if let Err(e) = self.inner.link.send_to(data, target).await {
            self.inner.shared.lock().transactions.clear(tid.get());
            return Err(e.into());
        }
        debug!("Sent {:?} tid={} to {} {}", esv, tid, target, object);

        match timeout(self.inner.config.response_timeout(), completion).await {
            Ok(Ok(())) => Ok(true),
            // Entry replaced after the TID wrapped around
            Ok(Err(_)) => Ok(false),
            Err(_) => {
                let still_outstanding = self.inner.shared.lock().transactions.abandon(tid);
                if still_outstanding {
                    warn!("No response from {} for tid={}", host, tid);
                    Ok(false)
                } else {
                    Ok(true)
                }
            }
        }
    }

    /// Ask node profiles for their instance lists
    ///
    /// Without a host the request goes to the multicast group.
    pub async fn discover(&self, host: Option<IpAddr>) -> Result<bool> {
        let target = host.unwrap_or_else(|| self.inner.config.discovery_target());
        info!("Discovering devices via {}", target);
        self.request(
            target,
            EchonetObject::node_profile(),
            ServiceCode::Get,
            vec![Property::request(INSTANCE_LIST)],
        )
        .await
    }

    /// Read the three property maps of an instance
    pub async fn get_all_property_maps(&self, host: IpAddr, object: EchonetObject) -> Result<bool> {
        self.get(host, object, &[STATUS_MAP, GET_MAP, SET_MAP]).await
    }

    /// Read the identification number and manufacturer code of an instance
    pub async fn get_identification_information(
        &self,
        host: IpAddr,
        object: EchonetObject,
    ) -> Result<bool> {
        self.get(host, object, &[IDENTIFICATION_NUMBER, MANUFACTURER_CODE])
            .await
    }

    /// Read properties
    pub async fn get(&self, host: IpAddr, object: EchonetObject, codes: &[u8]) -> Result<bool> {
        let properties = codes.iter().copied().map(Property::request).collect();
        self.request(host, object, ServiceCode::Get, properties).await
    }

    /// Write properties, asking the device to confirm
    pub async fn set(
        &self,
        host: IpAddr,
        object: EchonetObject,
        properties: Vec<Property>,
    ) -> Result<bool> {
        self.request(host, object, ServiceCode::SetC, properties).await
    }

    /// Call `handler` whenever a tracked property of `object` on `host` changes
    ///
    /// The argument is `true` for unsolicited updates. Handlers run on the
    /// receive path: awaiting another request from inside one would stall
    /// until that request times out, so spawn follow-up work instead.
    pub fn register_update_handler<F, Fut>(&self, host: IpAddr, object: EchonetObject, handler: F)
    where
        F: Fn(bool) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let handler: UpdateHandler =
            Arc::new(move |is_push: bool| -> HandlerFuture { Box::pin(handler(is_push)) });
        self.inner
            .shared
            .lock()
            .callbacks
            .register(InstanceKey::new(host, object), handler);
        debug!("Registered update handler for {} {}", host, object);
    }

    /// Process one inbound datagram from `from`
    pub async fn handle_datagram(&self, data: &[u8], from: IpAddr) -> Result<MessageReport> {
        let frame = codec::decode(data)?;
        let source = frame.seoj;

        let (correlated, handlers) = {
            let mut guard = self.inner.shared.lock();
            let shared = &mut *guard;
            let correlated = shared.transactions.is_outstanding(frame.tid);
            let mut updated = false;

            for property in &frame.properties {
                let is_discovery = discovery::is_instance_list(source, property.epc);
                if !is_discovery && !shared.tree.has_node(from) {
                    trace!("Ignoring 0x{:02X} from unknown host {}", property.epc, from);
                    continue;
                }

                match self
                    .inner
                    .router
                    .apply(&mut shared.tree, from, source, frame.esv, property)
                {
                    Ok(outcome) => updated |= outcome.is_change(),
                    Err(e) => warn!(
                        "Failed to apply 0x{:02X} from {} {}: {}",
                        property.epc, from, source, e
                    ),
                }
            }

            let handlers = if updated {
                Some(shared.callbacks.handlers_for(&InstanceKey::new(from, source)))
            } else {
                None
            };
            (correlated, handlers)
        };

        let mut report = MessageReport {
            correlated,
            ..MessageReport::default()
        };

        if let Some(handlers) = handlers {
            report.updated = true;
            let key = InstanceKey::new(from, source);
            report.handler_failures = callbacks::dispatch(&key, handlers, !correlated).await;
            if report.handler_failures > 0 {
                warn!(
                    "{} update handler(s) failed for {} {}",
                    report.handler_failures, from, source
                );
            }
        }

        if correlated {
            self.inner.shared.lock().transactions.clear(frame.tid);
        }

        Ok(report)
    }

    /// Drive [`handle_datagram`](Self::handle_datagram) from `receiver`
    ///
    /// Replaces (and stops) any receive loop started earlier.
    pub fn spawn_receiver<R>(&self, mut receiver: R)
    where
        R: TransportReceiver + 'static,
    {
        let client = self.clone();
        let handle = tokio::spawn(async move {
            while let Some((event, from)) = receiver.recv_from().await {
                match event {
                    TransportEvent::Data(data) => {
                        if let Err(e) = client.handle_datagram(&data, from.ip()).await {
                            warn!("Dropping datagram from {}: {}", from, e);
                        }
                    }
                    TransportEvent::Error(e) => {
                        error!("Receive error: {}", e);
                    }
                }
            }
            debug!("Receive loop stopped");
        });

        if let Some(previous) = self.inner.receiver.lock().replace(handle) {
            previous.abort();
        }
    }

    pub fn is_discovered(&self, host: IpAddr) -> bool {
        self.inner.shared.lock().tree.is_discovered(host)
    }

    /// Current value of a mirrored property
    pub fn property(&self, host: IpAddr, object: EchonetObject, epc: u8) -> Option<PropertyValue> {
        self.inner
            .shared
            .lock()
            .tree
            .property(host, object, epc)
            .cloned()
    }

    /// Copy of every mirrored property of one instance
    pub fn instance_properties(&self, host: IpAddr, object: EchonetObject) -> Option<PropertyMap> {
        self.inner
            .shared
            .lock()
            .tree
            .node(host)?
            .instance(object)
            .cloned()
    }

    /// Objects known on `host`
    pub fn instances(&self, host: IpAddr) -> Vec<EchonetObject> {
        self.inner
            .shared
            .lock()
            .tree
            .node(host)
            .map(|node| node.objects().collect())
            .unwrap_or_default()
    }

    /// Hosts with a node in the tree
    pub fn hosts(&self) -> Vec<IpAddr> {
        let mut hosts: Vec<IpAddr> = self.inner.shared.lock().tree.hosts().collect();
        hosts.sort();
        hosts
    }

    pub fn snapshot(&self) -> Snapshot {
        self.inner.shared.lock().tree.snapshot()
    }

    pub fn is_outstanding(&self, tid: u16) -> bool {
        self.inner.shared.lock().transactions.is_outstanding(tid)
    }

    pub fn outstanding_count(&self) -> usize {
        self.inner.shared.lock().transactions.outstanding_count()
    }

    /// Stop the receive loop
    pub fn close(&self) {
        if let Some(handle) = self.inner.receiver.lock().take() {
            handle.abort();
            info!("Client closed");
        }
    }
}

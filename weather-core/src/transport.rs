//! HTTPS plumbing: trust anchor, the `Transport` seam and its reqwest implementation.

use async_trait::async_trait;
use reqwest::{Certificate, Client, redirect};
use std::fmt::Debug;

use crate::error::TransportError;

/// Root certificate served by `api.openweathermap.org`'s chain (USERTrust RSA).
const OPENWEATHERMAP_ROOT_PEM: &str = include_str!("../certs/usertrust-rsa-root.pem");

const PEM_CERT_MARKER: &str = "-----BEGIN CERTIFICATE-----";

/// The only root certificate a transport will accept for server authentication.
#[derive(Debug, Clone)]
pub struct TrustAnchor {
    pem: Vec<u8>,
}

impl TrustAnchor {
    /// Accepts a PEM root only if a pinned client can actually be built on it.
    pub fn from_pem(pem: impl Into<Vec<u8>>) -> Result<Self, TransportError> {
        let pem = pem.into();

        let has_block = std::str::from_utf8(&pem).is_ok_and(|text| text.contains(PEM_CERT_MARKER));
        if !has_block {
            return Err(TransportError::ConnectionSetupFailed(
                "trust anchor contains no PEM certificate".to_string(),
            ));
        }

        // reqwest defers DER decoding under rustls until the client is built.
        let anchor = Self { pem };
        pinned_client(anchor.certificate()?)?;
        Ok(anchor)
    }

    /// The bundled root for the public OpenWeatherMap endpoint.
    pub fn openweathermap() -> Self {
        Self { pem: OPENWEATHERMAP_ROOT_PEM.as_bytes().to_vec() }
    }

    fn certificate(&self) -> Result<Certificate, TransportError> {
        Certificate::from_pem(&self.pem).map_err(invalid_anchor)
    }
}

fn invalid_anchor(e: reqwest::Error) -> TransportError {
    TransportError::ConnectionSetupFailed(format!("invalid trust anchor: {e}"))
}

fn pinned_client(root: Certificate) -> Result<Client, TransportError> {
    Client::builder()
        .use_rustls_tls()
        .tls_built_in_root_certs(false)
        .add_root_certificate(root)
        // A 301 is accepted with its own body, never followed.
        .redirect(redirect::Policy::none())
        // No connection outlives the call that opened it.
        .pool_max_idle_per_host(0)
        .build()
        .map_err(invalid_anchor)
}

/// Status and fully buffered body of one exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

#[async_trait]
pub trait Transport: Send + Sync + Debug {
    /// Perform a single GET, returning once the whole body has been read.
    async fn get(&self, url: &str) -> Result<HttpReply, TransportError>;
}

/// reqwest over rustls, pinned to a single [`TrustAnchor`].
#[derive(Debug, Clone)]
pub struct HttpsTransport {
    http: Client,
}

impl HttpsTransport {
    pub fn new(anchor: &TrustAnchor) -> Result<Self, TransportError> {
        let http = pinned_client(anchor.certificate()?)?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Transport for HttpsTransport {
    async fn get(&self, url: &str) -> Result<HttpReply, TransportError> {
        let res = self.http.get(url).send().await.map_err(|e| {
            if e.is_builder() {
                TransportError::ConnectionSetupFailed(e.to_string())
            } else {
                TransportError::RequestFailed(e.to_string())
            }
        })?;

        let status = res.status().as_u16();
        let body = res.text().await.map_err(|e| {
            TransportError::RequestFailed(format!("failed to read response body: {e}"))
        })?;

        Ok(HttpReply { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use rcgen::{
        BasicConstraints, CertificateParams, ExtendedKeyUsagePurpose, IsCa, KeyPair,
        KeyUsagePurpose,
    };
    use std::sync::Arc;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };
    use tokio_rustls::{
        TlsAcceptor,
        rustls::{
            ServerConfig,
            crypto::ring,
            pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer},
        },
    };

    const CORRUPT_PEM: &str = "-----BEGIN CERTIFICATE-----\nAAAA\n-----END CERTIFICATE-----\n";

    /// Local HTTPS server whose leaf for `127.0.0.1` is signed by a throwaway CA.
    struct TlsServer {
        ca_pem: String,
        base_url: String,
    }

    impl TlsServer {
        async fn start(body: &'static str) -> Self {
            let ca_key = KeyPair::generate().expect("ca key");
            let mut ca_params = CertificateParams::new(Vec::<String>::new()).expect("ca params");
            ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
            ca_params.key_usages = vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::CrlSign];
            let ca = ca_params.self_signed(&ca_key).expect("ca cert");

            let leaf_key = KeyPair::generate().expect("leaf key");
            let mut leaf_params =
                CertificateParams::new(vec!["127.0.0.1".to_string(), "localhost".to_string()])
                    .expect("leaf params");
            leaf_params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];
            let leaf = leaf_params.signed_by(&leaf_key, &ca, &ca_key).expect("leaf cert");

            let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(leaf_key.serialize_der()));
            let config = ServerConfig::builder_with_provider(Arc::new(ring::default_provider()))
                .with_safe_default_protocol_versions()
                .expect("protocol versions")
                .with_no_client_auth()
                .with_single_cert(vec![leaf.der().clone()], key)
                .expect("server config");
            let acceptor = TlsAcceptor::from(Arc::new(config));

            let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
            let port = listener.local_addr().expect("addr").port();

            tokio::spawn(async move {
                while let Ok((tcp, _)) = listener.accept().await {
                    let acceptor = acceptor.clone();
                    tokio::spawn(async move {
                        // Clients that reject the certificate abort the handshake here.
                        let Ok(mut tls) = acceptor.accept(tcp).await else { return };

                        let mut request = Vec::new();
                        let mut chunk = [0u8; 1024];
                        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                            match tls.read(&mut chunk).await {
                                Ok(0) | Err(_) => return,
                                Ok(n) => request.extend_from_slice(&chunk[..n]),
                            }
                        }

                        let reply = format!(
                            "HTTP/1.1 200 OK\r\n\
                             content-length: {}\r\n\
                             connection: close\r\n\r\n{body}",
                            body.len()
                        );
                        let _ = tls.write_all(reply.as_bytes()).await;
                        let _ = tls.shutdown().await;
                    });
                }
            });

            Self { ca_pem: ca.pem(), base_url: format!("https://127.0.0.1:{port}") }
        }
    }

    #[test]
    fn bundled_anchor_builds_a_transport() {
        let anchor = TrustAnchor::openweathermap();
        assert!(HttpsTransport::new(&anchor).is_ok());
    }

    #[test]
    fn from_pem_accepts_the_bundled_certificate() {
        assert!(TrustAnchor::from_pem(OPENWEATHERMAP_ROOT_PEM).is_ok());
    }

    #[test]
    fn from_pem_rejects_non_certificates() {
        let err = TrustAnchor::from_pem("not a certificate").unwrap_err();
        assert!(matches!(err, TransportError::ConnectionSetupFailed(_)));

        let err = TrustAnchor::from_pem(vec![0xff, 0xfe, 0x00]).unwrap_err();
        assert!(matches!(err, TransportError::ConnectionSetupFailed(_)));
    }

    #[test]
    fn from_pem_rejects_a_marked_block_with_garbage_inside() {
        let err = TrustAnchor::from_pem(CORRUPT_PEM).unwrap_err();
        assert!(matches!(err, TransportError::ConnectionSetupFailed(_)));
    }

    #[tokio::test]
    async fn pinned_root_completes_a_tls_exchange() {
        let server = TlsServer::start("sunny").await;
        let anchor = TrustAnchor::from_pem(server.ca_pem.clone()).expect("anchor");

        let transport = HttpsTransport::new(&anchor).expect("transport");
        let reply = transport.get(&format!("{}/weather", server.base_url)).await.expect("reply");

        assert_eq!(reply, HttpReply { status: 200, body: "sunny".into() });
    }

    #[tokio::test]
    async fn server_outside_the_pinned_root_is_rejected() {
        let server = TlsServer::start("sunny").await;

        let transport = HttpsTransport::new(&TrustAnchor::openweathermap()).expect("transport");
        let err = transport.get(&format!("{}/weather", server.base_url)).await.unwrap_err();

        assert!(matches!(err, TransportError::RequestFailed(_)));
    }

    #[tokio::test]
    async fn get_buffers_status_and_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/ping");
                then.status(418).body("short and stout");
            })
            .await;

        let transport = HttpsTransport::new(&TrustAnchor::openweathermap()).expect("transport");
        let reply = transport.get(&server.url("/ping")).await.expect("reply");

        mock.assert_async().await;
        assert_eq!(reply, HttpReply { status: 418, body: "short and stout".into() });
    }

    #[tokio::test]
    async fn redirects_are_not_followed() {
        let server = MockServer::start_async().await;
        let moved = server
            .mock_async(|when, then| {
                when.method(GET).path("/old");
                then.status(301).header("Location", "/new").body("moved body");
            })
            .await;
        let target = server
            .mock_async(|when, then| {
                when.method(GET).path("/new");
                then.status(200).body("new body");
            })
            .await;

        let transport = HttpsTransport::new(&TrustAnchor::openweathermap()).expect("transport");
        let reply = transport.get(&server.url("/old")).await.expect("reply");

        moved.assert_async().await;
        target.assert_hits_async(0).await;
        assert_eq!(reply.status, 301);
        assert_eq!(reply.body, "moved body");
    }

    #[tokio::test]
    async fn unreachable_host_is_a_request_failure() {
        let transport = HttpsTransport::new(&TrustAnchor::openweathermap()).expect("transport");
        // Port 9 on localhost: nothing listens there in test environments.
        let err = transport.get("http://127.0.0.1:9/weather").await.unwrap_err();
        assert!(matches!(err, TransportError::RequestFailed(_)));
    }

    #[tokio::test]
    async fn unparseable_url_is_a_setup_failure() {
        let transport = HttpsTransport::new(&TrustAnchor::openweathermap()).expect("transport");
        let err = transport.get("not a url").await.unwrap_err();
        assert!(matches!(err, TransportError::ConnectionSetupFailed(_)));
    }
}

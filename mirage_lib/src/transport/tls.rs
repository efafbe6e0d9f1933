/**********************************************************************

Copyright (C) 2022 by the mirage authors

This program is free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation, either version 3 of the License, or
(at your option) any later version.

This program is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with this program.  If not, see <https://www.gnu.org/licenses/>.

**********************************************************************/

use crate::prelude::*;
use once_cell::sync::Lazy;
use std::io;
use tokio_rustls::rustls;

pub type ClientStream<RW> = tokio_rustls::client::TlsStream<RW>;
pub type ServerStream<RW> = tokio_rustls::server::TlsStream<RW>;

// Process-wide client session cache, shared by the outer and inner
// TLS layers so resumption works across reconnects.
static SESSION_CACHE: Lazy<Arc<rustls::ClientSessionMemoryCache>> =
	Lazy::new(|| rustls::ClientSessionMemoryCache::new(128));

#[derive(thiserror::Error, Debug)]
pub enum SslError {
	#[error("Cannot read file {1} ({0})")]
	CannotReadFile(io::Error, String),
	#[error("Cannot parse certificate file")]
	CannotParseCertificateFile,
	#[error("Cannot parse private key file")]
	CannotParsePrivateKeyFile,
	#[error("TLSError ({0})")]
	Other(rustls::TLSError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("empty cert file")]
	EmptyCertFile,
	#[error("empty key file")]
	EmptyKeyFile,
	#[error("TLS error({0})")]
	SslError(#[from] SslError),
	#[error("{0}")]
	Other(Cow<'static, str>),
}

// ----------------------------------------------------
//                    Acceptor
// ----------------------------------------------------

pub struct Acceptor {
	inner: tokio_rustls::TlsAcceptor,
}

impl Acceptor {
	/// Load the certificate chain and private key and build an acceptor.
	///
	/// # Errors
	///
	/// Returns a [`ConfigError`] if the files cannot be read or parsed.
	pub fn new<'a>(
		cert_file: &str,
		key_file: &str,
		alpns: impl IntoIterator<Item = &'a [u8]>,
	) -> Result<Self, ConfigError> {
		if cert_file.is_empty() {
			return Err(ConfigError::EmptyCertFile);
		}
		if key_file.is_empty() {
			return Err(ConfigError::EmptyKeyFile);
		}
		let mut config = rustls::ServerConfig::new(rustls::NoClientAuth::new());
		{
			let cert_file = std::fs::File::open(cert_file)
				.map_err(|e| SslError::CannotReadFile(e, cert_file.to_string()))?;
			let cert = rustls::internal::pemfile::certs(&mut io::BufReader::new(cert_file))
				.map_err(|_| SslError::CannotParseCertificateFile)?;
			let key = read_private_key(key_file)?;
			config.set_single_cert(cert, key).map_err(SslError::Other)?;
		}
		config.alpn_protocols = alpns.into_iter().map(<[u8]>::to_vec).collect();
		let config = Arc::new(config);
		Ok(Acceptor {
			inner: config.into(),
		})
	}

	/// # Errors
	///
	/// Returns an [`io::Error`] if the handshake fails.
	pub async fn accept<RW>(&self, stream: RW) -> io::Result<ServerStream<RW>>
	where
		RW: AsyncRead + AsyncWrite + Unpin,
	{
		self.inner.accept(stream).await
	}
}

fn read_private_key(key_file: &str) -> Result<rustls::PrivateKey, ConfigError> {
	let open = || {
		std::fs::File::open(key_file)
			.map_err(|e| SslError::CannotReadFile(e, key_file.to_string()))
	};
	let keys = rustls::internal::pemfile::pkcs8_private_keys(&mut io::BufReader::new(open()?))
		.map_err(|_| SslError::CannotParsePrivateKeyFile)?;
	if let Some(key) = keys.into_iter().next() {
		return Ok(key);
	}
	// PKCS#1 keys are what most ACME clients hand out.
	let keys = rustls::internal::pemfile::rsa_private_keys(&mut io::BufReader::new(open()?))
		.map_err(|_| SslError::CannotParsePrivateKeyFile)?;
	keys.into_iter().next().ok_or(ConfigError::EmptyKeyFile)
}

// ----------------------------------------------------
//                    Connector
// ----------------------------------------------------

/// Client-side TLS knobs; the observable effects follow the config keys.
#[derive(Debug, Clone, Default)]
pub struct ConnectorBuilder {
	/// Server name sent in the handshake; the destination domain is used
	/// if empty.
	pub sni: String,
	/// When false, certificate chain and hostname checks are skipped.
	pub verify: bool,
	/// When false (and `verify` is true), the chain is checked but the
	/// hostname is not.
	pub verify_hostname: bool,
	pub alpns: Vec<String>,
	/// Colon-separated cipher suite names; empty means library default.
	pub cipher: String,
	pub session_ticket: bool,
	/// Extra CA file; the bundled roots are used if empty.
	pub ca_file: Option<String>,
}

impl ConnectorBuilder {
	/// Build a [`Connector`].
	///
	/// # Errors
	///
	/// Returns a [`ConfigError`] on unreadable CA file or invalid SNI.
	pub fn build(self) -> Result<Connector, ConfigError> {
		debug!(
			"Building TLS connector with sni '{}', verify {}, verify_hostname {}",
			self.sni, self.verify, self.verify_hostname
		);
		let mut config = rustls::ClientConfig::new();
		if let Some(ca_file) = self.ca_file.as_deref().filter(|f| !f.is_empty()) {
			let ca_file = std::fs::File::open(ca_file)
				.map_err(|e| SslError::CannotReadFile(e, ca_file.to_string()))?;
			let (_added, _unsuitable) = config
				.root_store
				.add_pem_file(&mut std::io::BufReader::new(ca_file))
				.map_err(|_| SslError::CannotParseCertificateFile)?;
		} else {
			config
				.root_store
				.add_server_trust_anchors(&webpki_roots::TLS_SERVER_ROOTS);
		}
		config.alpn_protocols = self.alpns.iter().map(|a| a.as_bytes().to_vec()).collect();
		if !self.cipher.is_empty() {
			config.ciphersuites = pick_ciphersuites(&self.cipher);
		}
		config.enable_tickets = self.session_ticket;
		config.set_persistence(SESSION_CACHE.clone());
		if !self.verify {
			config
				.dangerous()
				.set_certificate_verifier(Arc::new(NoVerify));
		} else if !self.verify_hostname {
			if self.ca_file.is_some() {
				warn!("verify_hostname is ignored when a custom CA file is set");
			} else {
				config
					.dangerous()
					.set_certificate_verifier(Arc::new(VerifyChainOnly));
			}
		}
		let sni = if self.sni.is_empty() {
			None
		} else {
			let name = webpki::DNSNameRef::try_from_ascii_str(&self.sni)
				.map_err(|_| ConfigError::Other(format!("invalid sni '{}'", self.sni).into()))?;
			Some(name.to_owned())
		};
		Ok(Connector {
			inner: Arc::new(config).into(),
			sni,
		})
	}
}

pub struct Connector {
	inner: tokio_rustls::TlsConnector,
	sni: Option<webpki::DNSName>,
}

impl Connector {
	/// # Errors
	///
	/// Returns an [`io::Error`] if the handshake fails, or if no usable
	/// server name is available.
	pub async fn connect<RW>(&self, stream: RW, addr: &Address) -> io::Result<ClientStream<RW>>
	where
		RW: AsyncRead + AsyncWrite + Unpin,
	{
		let name = match &self.sni {
			Some(name) => name.as_ref(),
			None => match &addr.dest {
				Destination::Name(name) => webpki::DNSNameRef::try_from_ascii(name.as_bytes())
					.map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?,
				Destination::Ip(_) => {
					return Err(io::Error::new(
						io::ErrorKind::InvalidInput,
						"IP destination requires an explicit sni",
					))
				}
			},
		};
		self.inner.connect(name, stream).await
	}
}

fn pick_ciphersuites(names: &str) -> Vec<&'static rustls::SupportedCipherSuite> {
	let mut result = Vec::new();
	for name in names.split(':').filter(|n| !n.is_empty()) {
		let found = rustls::ALL_CIPHERSUITES
			.iter()
			.find(|cs| format!("{:?}", cs.suite).eq_ignore_ascii_case(name));
		if let Some(cs) = found {
			result.push(*cs);
		} else {
			warn!("unknown cipher suite '{}' ignored", name);
		}
	}
	if result.is_empty() {
		warn!("no usable cipher suites in '{}', using defaults", names);
		return rustls::ALL_CIPHERSUITES.to_vec();
	}
	result
}

struct NoVerify;

impl rustls::ServerCertVerifier for NoVerify {
	fn verify_server_cert(
		&self,
		_roots: &rustls::RootCertStore,
		_presented_certs: &[rustls::Certificate],
		_dns_name: webpki::DNSNameRef<'_>,
		_ocsp_response: &[u8],
	) -> Result<rustls::ServerCertVerified, rustls::TLSError> {
		Ok(rustls::ServerCertVerified::assertion())
	}
}

static ALL_SIGALGS: &[&webpki::SignatureAlgorithm] = &[
	&webpki::ECDSA_P256_SHA256,
	&webpki::ECDSA_P256_SHA384,
	&webpki::ECDSA_P384_SHA256,
	&webpki::ECDSA_P384_SHA384,
	&webpki::ED25519,
	&webpki::RSA_PKCS1_2048_8192_SHA256,
	&webpki::RSA_PKCS1_2048_8192_SHA384,
	&webpki::RSA_PKCS1_2048_8192_SHA512,
	&webpki::RSA_PKCS1_3072_8192_SHA384,
];

/// Validates the certificate chain against the bundled roots
/// but does not check the hostname.
struct VerifyChainOnly;

impl rustls::ServerCertVerifier for VerifyChainOnly {
	fn verify_server_cert(
		&self,
		_roots: &rustls::RootCertStore,
		presented_certs: &[rustls::Certificate],
		_dns_name: webpki::DNSNameRef<'_>,
		_ocsp_response: &[u8],
	) -> Result<rustls::ServerCertVerified, rustls::TLSError> {
		let (end_entity, intermediates) = presented_certs
			.split_first()
			.ok_or(rustls::TLSError::NoCertificatesPresented)?;
		let cert = webpki::EndEntityCert::from(&end_entity.0)
			.map_err(rustls::TLSError::WebPKIError)?;
		let chain: Vec<&[u8]> = intermediates.iter().map(|c| c.0.as_slice()).collect();
		let now = webpki::Time::try_from(std::time::SystemTime::now())
			.map_err(|_| rustls::TLSError::FailedToGetCurrentTime)?;
		cert.verify_is_valid_tls_server_cert(
			ALL_SIGALGS,
			&webpki_roots::TLS_SERVER_ROOTS,
			&chain,
			now,
		)
		.map_err(rustls::TLSError::WebPKIError)?;
		Ok(rustls::ServerCertVerified::assertion())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_pick_ciphersuites() {
		let all = pick_ciphersuites("TLS13_AES_128_GCM_SHA256:TLS13_AES_256_GCM_SHA384");
		assert_eq!(all.len(), 2);
		// Unknown names fall back to the defaults instead of an empty list.
		let fallback = pick_ciphersuites("NOT_A_SUITE");
		assert_eq!(fallback.len(), rustls::ALL_CIPHERSUITES.len());
	}

	#[test]
	fn test_connector_builder_rejects_bad_sni() {
		let builder = ConnectorBuilder {
			sni: "bad sni with spaces".into(),
			verify: true,
			verify_hostname: true,
			..Default::default()
		};
		assert!(builder.build().is_err());
	}

	#[test]
	fn test_acceptor_requires_files() {
		assert!(matches!(
			Acceptor::new("", "key.pem", std::iter::empty()),
			Err(ConfigError::EmptyCertFile)
		));
		assert!(matches!(
			Acceptor::new("cert.pem", "", std::iter::empty()),
			Err(ConfigError::EmptyKeyFile)
		));
	}
}

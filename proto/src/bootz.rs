// Copyright (c) 2025 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

//! Message and service definitions for `bootz.Bootstrap`.

/// A replaceable CPU module inside a chassis.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ControlCard {
    #[prost(string, tag = "1")]
    pub serial_number: ::prost::alloc::string::String,
    #[prost(uint32, tag = "2")]
    pub slot: u32,
    #[prost(string, tag = "3")]
    pub part_number: ::prost::alloc::string::String,
}

/// Identifies the chassis making a bootstrap request.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChassisDescriptor {
    #[prost(string, tag = "1")]
    pub manufacturer: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub serial_number: ::prost::alloc::string::String,
    #[prost(message, repeated, tag = "3")]
    pub control_cards: ::prost::alloc::vec::Vec<ControlCard>,
}

/// Reported state of a single control card.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ControlCardState {
    #[prost(string, tag = "1")]
    pub serial_number: ::prost::alloc::string::String,
    #[prost(enumeration = "control_card_state::Status", tag = "2")]
    pub status: i32,
}
/// Nested message and enum types in `ControlCardState`.
pub mod control_card_state {
    #[derive(
        Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration,
    )]
    #[repr(i32)]
    pub enum Status {
        Unspecified = 0,
        NotInitialized = 1,
        Initialized = 2,
    }
    impl Status {
        /// String value of the enum field names used in the ProtoBuf definition.
        pub fn as_str_name(&self) -> &'static str {
            match self {
                Status::Unspecified => "CONTROL_CARD_STATUS_UNSPECIFIED",
                Status::NotInitialized => "CONTROL_CARD_STATUS_NOT_INITIALIZED",
                Status::Initialized => "CONTROL_CARD_STATUS_INITIALIZED",
            }
        }
    }
}
/// Boot image the device is expected to install, with an integrity hash.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SoftwareImage {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub version: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub url: ::prost::alloc::string::String,
    #[prost(string, tag = "4")]
    pub os_image_hash: ::prost::alloc::string::String,
    #[prost(string, tag = "5")]
    pub hash_algorithm: ::prost::alloc::string::String,
}

/// Opaque boot configuration plus vendor metadata.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BootConfig {
    #[prost(bytes = "vec", tag = "1")]
    pub metadata: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub vendor_config: ::prost::alloc::vec::Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Credentials {
    #[prost(string, tag = "1")]
    pub boot_password_hash: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub failsafe_boot_password_hash: ::prost::alloc::string::String,
}

/// Bootstrap data assembled for one control card.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BootstrapDataResponse {
    #[prost(string, tag = "1")]
    pub serial_num: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "2")]
    pub intended_image: ::core::option::Option<SoftwareImage>,
    #[prost(message, optional, tag = "3")]
    pub boot_config: ::core::option::Option<BootConfig>,
    #[prost(message, optional, tag = "4")]
    pub credentials: ::core::option::Option<Credentials>,
    #[prost(bytes = "vec", tag = "5")]
    pub pathz_policy: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "6")]
    pub authz_policy: ::prost::alloc::vec::Vec<u8>,
}

/// The payload covered by the response signature. Encoded with prost on both
/// sides, which yields identical bytes for identical field presence.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BootstrapDataSigned {
    #[prost(message, repeated, tag = "1")]
    pub responses: ::prost::alloc::vec::Vec<BootstrapDataResponse>,
    #[prost(string, tag = "2")]
    pub nonce: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub ostype: ::prost::alloc::string::String,
    #[prost(string, tag = "4")]
    pub serial_num: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetBootstrapDataRequest {
    #[prost(message, optional, tag = "1")]
    pub chassis_descriptor: ::core::option::Option<ChassisDescriptor>,
    /// State of the active control card, i.e. the card making this request.
    #[prost(message, optional, tag = "2")]
    pub control_card_state: ::core::option::Option<ControlCardState>,
    #[prost(string, tag = "3")]
    pub nonce: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetBootstrapDataResponse {
    #[prost(message, optional, tag = "1")]
    pub signed_response: ::core::option::Option<BootstrapDataSigned>,
    /// PEM encoded ownership certificate. Only set in secure mode.
    #[prost(bytes = "vec", tag = "2")]
    pub ownership_certificate: ::prost::alloc::vec::Vec<u8>,
    /// Base64 encoded CMS ownership voucher. Only set in secure mode.
    #[prost(bytes = "vec", tag = "3")]
    pub ownership_voucher: ::prost::alloc::vec::Vec<u8>,
    /// Base64 encoded RSA-PKCS#1-v1.5 signature over the SHA-256 digest of the
    /// serialized `signed_response`. Only set in secure mode.
    #[prost(string, tag = "4")]
    pub response_signature: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReportStatusRequest {
    #[prost(enumeration = "report_status_request::BootstrapStatus", tag = "1")]
    pub status: i32,
    #[prost(string, tag = "2")]
    pub status_message: ::prost::alloc::string::String,
    #[prost(message, repeated, tag = "3")]
    pub states: ::prost::alloc::vec::Vec<ControlCardState>,
}
/// Nested message and enum types in `ReportStatusRequest`.
pub mod report_status_request {
    #[derive(
        Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration,
    )]
    #[repr(i32)]
    pub enum BootstrapStatus {
        Unspecified = 0,
        Success = 1,
        Failure = 2,
    }
    impl BootstrapStatus {
        /// String value of the enum field names used in the ProtoBuf definition.
        pub fn as_str_name(&self) -> &'static str {
            match self {
                BootstrapStatus::Unspecified => "BOOTSTRAP_STATUS_UNSPECIFIED",
                BootstrapStatus::Success => "BOOTSTRAP_STATUS_SUCCESS",
                BootstrapStatus::Failure => "BOOTSTRAP_STATUS_FAILURE",
            }
        }
    }
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EmptyResponse {}

/// Generated client implementations.
pub mod bootstrap_client {
    #![allow(unused_variables, dead_code, missing_docs, clippy::wildcard_imports)]
    use tonic::codegen::http::uri::PathAndQuery;
    use tonic::codegen::*;

    /// Client for the bootz.Bootstrap service.
    #[derive(Debug, Clone)]
    pub struct BootstrapClient<T> {
        inner: tonic::client::Grpc<T>,
    }

    impl BootstrapClient<tonic::transport::Channel> {
        /// Attempt to create a new client by connecting to a given endpoint.
        pub async fn connect<D>(dst: D) -> Result<Self, tonic::transport::Error>
        where
            D: TryInto<tonic::transport::Endpoint>,
            D::Error: Into<StdError>,
        {
            let conn = tonic::transport::Endpoint::new(dst)?.connect().await?;
            Ok(Self::new(conn))
        }
    }

    impl<T> BootstrapClient<T>
    where
        T: tonic::client::GrpcService<tonic::body::BoxBody>,
        T::Error: Into<StdError>,
        T::ResponseBody: Body<Data = Bytes> + Send + 'static,
        <T::ResponseBody as Body>::Error: Into<StdError> + Send,
    {
        pub fn new(inner: T) -> Self {
            let inner = tonic::client::Grpc::new(inner);
            Self { inner }
        }

        pub async fn get_bootstrap_data(
            &mut self,
            request: impl tonic::IntoRequest<super::GetBootstrapDataRequest>,
        ) -> std::result::Result<tonic::Response<super::GetBootstrapDataResponse>, tonic::Status>
        {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {}", e.into()),
                )
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = PathAndQuery::from_static("/bootz.Bootstrap/GetBootstrapData");
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("bootz.Bootstrap", "GetBootstrapData"));
            self.inner.unary(req, path, codec).await
        }

        pub async fn report_status(
            &mut self,
            request: impl tonic::IntoRequest<super::ReportStatusRequest>,
        ) -> std::result::Result<tonic::Response<super::EmptyResponse>, tonic::Status> {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {}", e.into()),
                )
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = PathAndQuery::from_static("/bootz.Bootstrap/ReportStatus");
            let mut req = request.into_request();
            req.extensions_mut()
                .insert(GrpcMethod::new("bootz.Bootstrap", "ReportStatus"));
            self.inner.unary(req, path, codec).await
        }
    }
}

/// Generated server implementations.
pub mod bootstrap_server {
    #![allow(unused_variables, dead_code, missing_docs, clippy::wildcard_imports)]
    use tonic::codegen::*;

    /// Generated trait containing gRPC methods that should be implemented for
    /// use with BootstrapServer.
    #[async_trait]
    pub trait Bootstrap: Send + Sync + 'static {
        async fn get_bootstrap_data(
            &self,
            request: tonic::Request<super::GetBootstrapDataRequest>,
        ) -> std::result::Result<tonic::Response<super::GetBootstrapDataResponse>, tonic::Status>;

        async fn report_status(
            &self,
            request: tonic::Request<super::ReportStatusRequest>,
        ) -> std::result::Result<tonic::Response<super::EmptyResponse>, tonic::Status>;
    }

    #[derive(Debug)]
    pub struct BootstrapServer<T: Bootstrap> {
        inner: Arc<T>,
    }

    impl<T: Bootstrap> BootstrapServer<T> {
        pub fn new(inner: T) -> Self {
            Self::from_arc(Arc::new(inner))
        }

        pub fn from_arc(inner: Arc<T>) -> Self {
            Self { inner }
        }
    }

    impl<T, B> tonic::codegen::Service<http::Request<B>> for BootstrapServer<T>
    where
        T: Bootstrap,
        B: Body + Send + 'static,
        B::Error: Into<StdError> + Send + 'static,
    {
        type Response = http::Response<tonic::body::BoxBody>;
        type Error = std::convert::Infallible;
        type Future = BoxFuture<Self::Response, Self::Error>;

        fn poll_ready(
            &mut self,
            _cx: &mut Context<'_>,
        ) -> Poll<std::result::Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, req: http::Request<B>) -> Self::Future {
            match req.uri().path() {
                "/bootz.Bootstrap/GetBootstrapData" => {
                    struct GetBootstrapDataSvc<T: Bootstrap>(pub Arc<T>);
                    impl<T: Bootstrap> tonic::server::UnaryService<super::GetBootstrapDataRequest>
                        for GetBootstrapDataSvc<T>
                    {
                        type Response = super::GetBootstrapDataResponse;
                        type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::GetBootstrapDataRequest>,
                        ) -> Self::Future {
                            let inner = Arc::clone(&self.0);
                            let fut = async move { inner.get_bootstrap_data(request).await };
                            Box::pin(fut)
                        }
                    }
                    let inner = Arc::clone(&self.inner);
                    let fut = async move {
                        let method = GetBootstrapDataSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec);
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/bootz.Bootstrap/ReportStatus" => {
                    struct ReportStatusSvc<T: Bootstrap>(pub Arc<T>);
                    impl<T: Bootstrap> tonic::server::UnaryService<super::ReportStatusRequest>
                        for ReportStatusSvc<T>
                    {
                        type Response = super::EmptyResponse;
                        type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::ReportStatusRequest>,
                        ) -> Self::Future {
                            let inner = Arc::clone(&self.0);
                            let fut = async move { inner.report_status(request).await };
                            Box::pin(fut)
                        }
                    }
                    let inner = Arc::clone(&self.inner);
                    let fut = async move {
                        let method = ReportStatusSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = tonic::server::Grpc::new(codec);
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                _ => Box::pin(async move {
                    Ok(http::Response::builder()
                        .status(200)
                        .header("grpc-status", "12")
                        .header("content-type", "application/grpc")
                        .body(empty_body())
                        .unwrap())
                }),
            }
        }
    }

    impl<T: Bootstrap> Clone for BootstrapServer<T> {
        fn clone(&self) -> Self {
            Self {
                inner: Arc::clone(&self.inner),
            }
        }
    }

    impl<T: Bootstrap> tonic::server::NamedService for BootstrapServer<T> {
        const NAME: &'static str = "bootz.Bootstrap";
    }
}

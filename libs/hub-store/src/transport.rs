//! Store service transport
//!
//! [`StoreTransport`] is the network seam of [`StoreClient`](crate::StoreClient): it receives a
//! request that already carries the auth header and deadline and returns the raw status on
//! failure. [`GrpcStoreTransport`] is the tonic implementation.

use crate::proto::{
    GetFilesRequest, GetFilesResponse, ListFilesRequest, ListFilesResponse, ModifyFilesRequest,
    ModifyFilesResponse, ReplaceFilesRequest, ReplaceFilesResponse,
};
use async_trait::async_trait;
use tonic::client::Grpc;
use tonic::codec::{CompressionEncoding, ProstCodec};
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::Channel;
use tonic::{GrpcMethod, Request, Status};

const SERVICE: &str = "cerbos.cloud.store.v1.CerbosStoreService";

#[async_trait]
pub trait StoreTransport: Send + Sync {
    async fn replace_files(
        &self,
        request: Request<ReplaceFilesRequest>,
    ) -> Result<ReplaceFilesResponse, Status>;

    async fn modify_files(
        &self,
        request: Request<ModifyFilesRequest>,
    ) -> Result<ModifyFilesResponse, Status>;

    async fn list_files(
        &self,
        request: Request<ListFilesRequest>,
    ) -> Result<ListFilesResponse, Status>;

    async fn get_files(&self, request: Request<GetFilesRequest>)
        -> Result<GetFilesResponse, Status>;
}

/// [`StoreTransport`] over a tonic channel
#[derive(Clone)]
pub struct GrpcStoreTransport {
    inner: Grpc<Channel>,
}

impl GrpcStoreTransport {
    pub fn new(channel: Channel) -> Self {
        Self {
            inner: Grpc::new(channel),
        }
    }

    async fn unary<Req, Resp>(
        &self,
        mut request: Request<Req>,
        method: &'static str,
        path: &'static str,
        compression: Option<CompressionEncoding>,
    ) -> Result<Resp, Status>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        let mut grpc = match compression {
            Some(encoding) => self.inner.clone().send_compressed(encoding),
            None => self.inner.clone(),
        };
        grpc.ready()
            .await
            .map_err(|e| Status::unavailable(format!("Store service was not ready: {}", e)))?;

        request
            .extensions_mut()
            .insert(GrpcMethod::new(SERVICE, method));

        let codec: ProstCodec<Req, Resp> = ProstCodec::default();
        let response = grpc
            .unary(request, PathAndQuery::from_static(path), codec)
            .await?;
        Ok(response.into_inner())
    }
}

#[async_trait]
impl StoreTransport for GrpcStoreTransport {
    async fn replace_files(
        &self,
        request: Request<ReplaceFilesRequest>,
    ) -> Result<ReplaceFilesResponse, Status> {
        self.unary(
            request,
            "ReplaceFiles",
            "/cerbos.cloud.store.v1.CerbosStoreService/ReplaceFiles",
            None,
        )
        .await
    }

    async fn modify_files(
        &self,
        request: Request<ModifyFilesRequest>,
    ) -> Result<ModifyFilesResponse, Status> {
        self.unary(
            request,
            "ModifyFiles",
            "/cerbos.cloud.store.v1.CerbosStoreService/ModifyFiles",
            Some(CompressionEncoding::Gzip),
        )
        .await
    }

    async fn list_files(
        &self,
        request: Request<ListFilesRequest>,
    ) -> Result<ListFilesResponse, Status> {
        self.unary(
            request,
            "ListFiles",
            "/cerbos.cloud.store.v1.CerbosStoreService/ListFiles",
            None,
        )
        .await
    }

    async fn get_files(
        &self,
        request: Request<GetFilesRequest>,
    ) -> Result<GetFilesResponse, Status> {
        self.unary(
            request,
            "GetFiles",
            "/cerbos.cloud.store.v1.CerbosStoreService/GetFiles",
            None,
        )
        .await
    }
}

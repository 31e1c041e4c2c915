//! reqwest-backed gateway for an Arweave-compatible HTTP API.
//!
//! Endpoints used:
//!
//! ```text
//! POST /graphql            tag/owner search (cursor-paginated)
//! GET  /{id}               whole blob
//! GET  /tx/{id}/data       bulk data, base64url body
//! GET  /tx/{id}/offset     {size, offset}
//! GET  /chunk/{offset}     {chunk}
//! GET  /tx/{id}            header: tags, data_size, owner
//! GET  /tx/{id}/status     200 finalized, 202 pending, 404 unknown
//! GET  /tx_anchor          recent block anchor
//! GET  /price/{size}       storage fee
//! POST /tx                 signed header
//! POST /chunk              data chunk with proof
//! ```

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;
use weave_crypto::{address_from_public_key, b64url_decode, b64url_encode, decode_tags, encode_tags, EncodedTag};
use weave_types::{Address, BlobId, BlobStatus, Tag, Tags};

use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::traits::Gateway;
use crate::transaction::{BlobTransaction, UploadChunk};
use crate::types::{BlobMetadata, BlobOffset, QueryEdge, TagQuery};

/// Results requested per GraphQL page.
const PAGE_SIZE: u32 = 100;

const TRANSACTIONS_QUERY: &str = "query($owners: [String!], $tags: [TagFilter!], $after: String, $first: Int) {
  transactions(owners: $owners, tags: $tags, after: $after, first: $first, sort: HEIGHT_DESC) {
    pageInfo { hasNextPage }
    edges { cursor node { id owner { address } tags { name value } block { timestamp } } }
  }
}";

/// Gateway client over HTTP.
#[derive(Clone, Debug)]
pub struct HttpGateway {
    client: reqwest::Client,
    config: GatewayConfig,
}

impl HttpGateway {
    /// Build a client; the configured timeout applies to every request.
    pub fn new(config: GatewayConfig) -> GatewayResult<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    async fn get(&self, path: &str) -> GatewayResult<reqwest::Response> {
        let url = self.config.endpoint(path);
        debug!(%url, "GET");
        Ok(self.client.get(url).send().await?)
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> GatewayResult<reqwest::Response> {
        let url = self.config.endpoint(path);
        debug!(%url, "POST");
        Ok(self.client.post(url).json(body).send().await?)
    }

    /// Fetch a blob-scoped resource, classifying pending / missing / oversized replies.
    async fn get_blob_resource(
        &self,
        path: &str,
        id: &BlobId,
        endpoint: &'static str,
    ) -> GatewayResult<reqwest::Response> {
        let resp = self.get(path).await?;
        match resp.status() {
            StatusCode::ACCEPTED => Err(GatewayError::Pending(*id)),
            StatusCode::NOT_FOUND => Err(GatewayError::NotFound(*id)),
            StatusCode::PAYLOAD_TOO_LARGE => Err(GatewayError::PayloadTooLarge { endpoint, size: None }),
            s if s.is_success() => Ok(resp),
            s => {
                let body = resp.text().await.unwrap_or_default();
                if s == StatusCode::BAD_REQUEST && body.contains("too_big") {
                    return Err(GatewayError::PayloadTooLarge { endpoint, size: None });
                }
                Err(GatewayError::Status {
                    status: s.as_u16(),
                    body,
                })
            }
        }
    }
}

async fn expect_success(resp: reqwest::Response) -> GatewayResult<reqwest::Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Err(GatewayError::Status { status, body })
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn graph_query(&self, query: &TagQuery) -> GatewayResult<Vec<QueryEdge>> {
        let mut edges = Vec::new();
        let mut after: Option<String> = None;
        loop {
            let body = graphql_body(query, after.as_deref());
            let resp = expect_success(self.post("graphql", &body).await?).await?;
            let page: GraphResponse = resp.json().await?;
            let (mut hits, next) = page.into_edges()?;
            edges.append(&mut hits);
            match next {
                Some(cursor) => after = Some(cursor),
                None => break,
            }
        }
        Ok(edges)
    }

    async fn fetch_blob_data(&self, id: &BlobId) -> GatewayResult<Vec<u8>> {
        let resp = self.get_blob_resource(&id.to_string(), id, "whole-blob").await?;
        Ok(resp.bytes().await?.to_vec())
    }

    async fn fetch_bulk_data(&self, id: &BlobId) -> GatewayResult<Vec<u8>> {
        let resp = self
            .get_blob_resource(&format!("tx/{id}/data"), id, "tx-data")
            .await?;
        let text = resp.text().await?;
        Ok(b64url_decode(text.trim())?)
    }

    async fn fetch_blob_offset(&self, id: &BlobId) -> GatewayResult<BlobOffset> {
        let resp = self
            .get_blob_resource(&format!("tx/{id}/offset"), id, "offset")
            .await?;
        let body: OffsetResponse = resp.json().await?;
        body.parse()
    }

    async fn fetch_chunk(&self, offset: u64) -> GatewayResult<String> {
        let resp = self.get(&format!("chunk/{offset}")).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(GatewayError::ChunkUnavailable { offset });
        }
        let body: ChunkResponse = expect_success(resp).await?.json().await?;
        Ok(body.chunk)
    }

    async fn fetch_blob_metadata(&self, id: &BlobId) -> GatewayResult<BlobMetadata> {
        let resp = self
            .get_blob_resource(&format!("tx/{id}"), id, "tx-header")
            .await?;
        let header: TxHeader = resp.json().await?;
        header.into_metadata(*id)
    }

    async fn blob_status(&self, id: &BlobId) -> GatewayResult<BlobStatus> {
        let resp = self.get(&format!("tx/{id}/status")).await?;
        match resp.status() {
            StatusCode::OK => Ok(BlobStatus::Finalized),
            StatusCode::ACCEPTED => Ok(BlobStatus::Pending),
            StatusCode::NOT_FOUND => Ok(BlobStatus::NotFound),
            _ => expect_success(resp).await.map(|_| BlobStatus::Finalized),
        }
    }

    async fn tx_anchor(&self) -> GatewayResult<String> {
        let resp = expect_success(self.get("tx_anchor").await?).await?;
        Ok(resp.text().await?.trim().to_string())
    }

    async fn price(&self, data_size: u64) -> GatewayResult<u64> {
        let resp = expect_success(self.get(&format!("price/{data_size}")).await?).await?;
        let text = resp.text().await?;
        text.trim()
            .parse()
            .map_err(|e| GatewayError::Decode(format!("price '{}': {e}", text.trim())))
    }

    async fn submit_blob(&self, tx: &BlobTransaction) -> GatewayResult<BlobStatus> {
        let resp = self.post("tx", &TxPayload::from(tx)).await?;
        match resp.status() {
            // Already known to the gateway.
            StatusCode::ALREADY_REPORTED => self.blob_status(&tx.id).await,
            s if s.is_success() => Ok(BlobStatus::Pending),
            s => {
                let body = resp.text().await.unwrap_or_default();
                Err(GatewayError::Rejected(format!("HTTP {}: {body}", s.as_u16())))
            }
        }
    }

    async fn submit_chunk(&self, chunk: &UploadChunk) -> GatewayResult<()> {
        let resp = self.post("chunk", &ChunkPayload::from(chunk)).await?;
        if resp.status().is_success() {
            return Ok(());
        }
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        Err(GatewayError::Rejected(format!(
            "chunk at offset {}: HTTP {status}: {body}",
            chunk.offset
        )))
    }
}

fn graphql_body(query: &TagQuery, after: Option<&str>) -> serde_json::Value {
    let owners: Vec<String> = query.owners.iter().map(Address::to_string).collect();
    let tags: Vec<serde_json::Value> = query
        .tags
        .iter()
        .map(|t| json!({ "name": t.name, "values": [t.value] }))
        .collect();
    json!({
        "query": TRANSACTIONS_QUERY,
        "variables": {
            "owners": if owners.is_empty() { serde_json::Value::Null } else { json!(owners) },
            "tags": tags,
            "after": after,
            "first": PAGE_SIZE,
        }
    })
}

#[derive(Deserialize)]
struct GraphResponse {
    data: Option<GraphData>,
    #[serde(default)]
    errors: Vec<GraphError>,
}

#[derive(Deserialize)]
struct GraphError {
    message: String,
}

#[derive(Deserialize)]
struct GraphData {
    transactions: Connection,
}

#[derive(Deserialize)]
struct Connection {
    #[serde(rename = "pageInfo")]
    page_info: PageInfo,
    edges: Vec<Edge>,
}

#[derive(Deserialize)]
struct PageInfo {
    #[serde(rename = "hasNextPage")]
    has_next_page: bool,
}

#[derive(Deserialize)]
struct Edge {
    cursor: String,
    node: Node,
}

#[derive(Deserialize)]
struct Node {
    id: String,
    owner: OwnerNode,
    tags: Vec<Tag>,
    block: Option<BlockNode>,
}

#[derive(Deserialize)]
struct OwnerNode {
    address: String,
}

#[derive(Deserialize)]
struct BlockNode {
    timestamp: u64,
}

impl GraphResponse {
    /// Decoded edges plus the cursor of the next page, if any.
    fn into_edges(self) -> GatewayResult<(Vec<QueryEdge>, Option<String>)> {
        if let Some(err) = self.errors.first() {
            return Err(GatewayError::Decode(format!("graphql: {}", err.message)));
        }
        let conn = self
            .data
            .ok_or_else(|| GatewayError::Decode("graphql response has no data".into()))?
            .transactions;

        let next = match conn.edges.last() {
            Some(last) if conn.page_info.has_next_page => Some(last.cursor.clone()),
            _ => None,
        };
        let edges = conn
            .edges
            .into_iter()
            .map(|e| {
                Ok(QueryEdge {
                    blob_id: BlobId::parse(&e.node.id)
                        .map_err(|err| GatewayError::Decode(err.to_string()))?,
                    owner: Address::parse(&e.node.owner.address)
                        .map_err(|err| GatewayError::Decode(err.to_string()))?,
                    block_timestamp: e.node.block.map(|b| b.timestamp),
                    tags: Tags::from(e.node.tags),
                })
            })
            .collect::<GatewayResult<Vec<_>>>()?;
        Ok((edges, next))
    }
}

#[derive(Deserialize)]
struct OffsetResponse {
    size: String,
    offset: String,
}

impl OffsetResponse {
    fn parse(&self) -> GatewayResult<BlobOffset> {
        let num = |field: &str, v: &str| {
            v.parse::<u64>()
                .map_err(|e| GatewayError::Decode(format!("offset.{field} '{v}': {e}")))
        };
        Ok(BlobOffset {
            size: num("size", &self.size)?,
            end_offset: num("offset", &self.offset)?,
        })
    }
}

#[derive(Deserialize)]
struct ChunkResponse {
    chunk: String,
}

#[derive(Deserialize)]
struct TxHeader {
    owner: String,
    tags: Vec<EncodedTag>,
    data_size: String,
}

impl TxHeader {
    fn into_metadata(self, id: BlobId) -> GatewayResult<BlobMetadata> {
        let owner_key = b64url_decode(&self.owner)?;
        Ok(BlobMetadata {
            id,
            owner: address_from_public_key(&owner_key),
            size: self
                .data_size
                .parse()
                .map_err(|e| GatewayError::Decode(format!("data_size '{}': {e}", self.data_size)))?,
            tags: decode_tags(&self.tags)?,
        })
    }
}

/// Wire form of a signed header for `POST /tx`. The transaction salt travels
/// ahead of the signature bytes in `signature`, which is what the id hashes.
#[derive(Serialize)]
struct TxPayload {
    format: u8,
    id: String,
    last_tx: String,
    owner: String,
    tags: Vec<EncodedTag>,
    target: String,
    quantity: String,
    data: String,
    data_size: String,
    data_root: String,
    reward: String,
    signature: String,
}

impl From<&BlobTransaction> for TxPayload {
    fn from(tx: &BlobTransaction) -> Self {
        Self {
            format: 2,
            id: tx.id.to_string(),
            last_tx: tx.anchor.clone(),
            owner: b64url_encode(&tx.owner),
            tags: encode_tags(&tx.tags),
            target: String::new(),
            quantity: "0".into(),
            data: String::new(),
            data_size: tx.data_size.to_string(),
            data_root: b64url_encode(tx.data_root),
            reward: tx.reward.to_string(),
            signature: b64url_encode(tx.wire_signature()),
        }
    }
}

/// Wire form of `POST /chunk`. The endpoint addresses a chunk by the offset
/// of its last byte within the data.
#[derive(Serialize)]
struct ChunkPayload {
    data_root: String,
    data_size: String,
    data_path: String,
    offset: String,
    chunk: String,
}

impl From<&UploadChunk> for ChunkPayload {
    fn from(c: &UploadChunk) -> Self {
        let last_byte = (c.offset + c.data.len() as u64).saturating_sub(1);
        Self {
            data_root: b64url_encode(c.data_root),
            data_size: c.data_size.to_string(),
            data_path: b64url_encode(c.proof.path_bytes()),
            offset: last_byte.to_string(),
            chunk: b64url_encode(&c.data),
        }
    }
}

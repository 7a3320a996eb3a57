use crate::error::{DatabaseError, DatabaseErrorExt};
use crate::DatabaseInner;
use reqwest::header::{ACCEPT, CONTENT_RANGE, HeaderMap};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt::Display;
use tracing::{debug, instrument};

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";
const PREFER: &str = "Prefer";

/// `PostgREST` client bound to one credential.
#[derive(Debug, Clone, Copy)]
pub struct Client<'a> {
    db: &'a DatabaseInner,
    apikey: &'a str,
    bearer: &'a str,
}

impl<'a> Client<'a> {
    pub(crate) const fn new(db: &'a DatabaseInner, apikey: &'a str, bearer: &'a str) -> Self {
        Self { db, apikey, bearer }
    }

    /// Starts a query against `table`.
    #[must_use]
    pub fn from(self, table: &str) -> Query<'a> {
        Query { client: self, table: table.to_owned(), params: Vec::new() }
    }

    /// Calls a database function and decodes its result.
    #[instrument(skip(self, args), fields(function = name))]
    pub async fn rpc<A, T>(self, name: &str, args: &A) -> Result<T, DatabaseError>
    where
        A: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/rpc/{name}", self.db.rest_url);
        let response = self.send(self.request(Method::POST, &url).json(args)).await?;
        decode(response, name).await
    }

    /// Calls a database function returning `void`.
    #[instrument(skip(self, args), fields(function = name))]
    pub async fn rpc_void<A>(self, name: &str, args: &A) -> Result<(), DatabaseError>
    where
        A: Serialize + ?Sized,
    {
        let url = format!("{}/rpc/{name}", self.db.rest_url);
        self.send(self.request(Method::POST, &url).json(args)).await.map(drop)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.db.http.request(method, url).header("apikey", self.apikey).bearer_auth(self.bearer)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, DatabaseError> {
        let response = request.send().await.context("Sending PostgREST request")?;
        if response.status().is_success() {
            return Ok(response);
        }
        Err(error_from_response(response).await)
    }
}

/// One page of rows with the exact total row count.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

/// Shape of the body requested from write operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Returning {
    /// No body; fastest.
    Minimal,
    /// The written rows.
    Representation,
}

impl Returning {
    const fn header(self) -> &'static str {
        match self {
            Self::Minimal => "return=minimal",
            Self::Representation => "return=representation",
        }
    }
}

/// Filter/modifier builder for a single table. Terminal methods consume it.
#[must_use = "queries do nothing until a terminal method is awaited"]
#[derive(Debug, Clone)]
pub struct Query<'a> {
    client: Client<'a>,
    table: String,
    params: Vec<(String, String)>,
}

impl Query<'_> {
    /// Columns to return (`PostgREST` select syntax, embedded resources allowed).
    pub fn select(mut self, columns: &str) -> Self {
        self.params.push(("select".to_owned(), columns.to_owned()));
        self
    }

    pub fn eq(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "eq", value)
    }

    pub fn neq(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "neq", value)
    }

    pub fn gt(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "gt", value)
    }

    pub fn lt(self, column: &str, value: impl Display) -> Self {
        self.filter(column, "lt", value)
    }

    /// Case-insensitive pattern match; `*` is the wildcard.
    pub fn ilike(self, column: &str, pattern: impl Display) -> Self {
        self.filter(column, "ilike", pattern)
    }

    pub fn is_null(mut self, column: &str) -> Self {
        self.params.push((column.to_owned(), "is.null".to_owned()));
        self
    }

    pub fn in_list<I, V>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Display,
    {
        let joined = values.into_iter().map(|v| v.to_string()).collect::<Vec<_>>().join(",");
        self.params.push((column.to_owned(), format!("in.({joined})")));
        self
    }

    /// Raw disjunction, e.g. `name.ilike.*mast*,sku.ilike.*mast*`.
    pub fn or(mut self, conditions: &str) -> Self {
        self.params.push(("or".to_owned(), format!("({conditions})")));
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let term = format!("{column}.{}", if ascending { "asc" } else { "desc" });
        match self.params.iter_mut().find(|(key, _)| key == "order") {
            Some((_, existing)) => {
                existing.push(',');
                existing.push_str(&term);
            },
            None => self.params.push(("order".to_owned(), term)),
        }
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.params.push(("limit".to_owned(), limit.to_string()));
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.params.push(("offset".to_owned(), offset.to_string()));
        self
    }

    fn filter(mut self, column: &str, operator: &str, value: impl Display) -> Self {
        self.params.push((column.to_owned(), format!("{operator}.{value}")));
        self
    }

    fn request(&self, method: Method) -> RequestBuilder {
        let url = format!("{}/{}", self.client.db.rest_url, self.table);
        self.client.request(method, &url).query(&self.params)
    }

    /// All matching rows.
    #[instrument(skip(self), fields(table = %self.table))]
    pub async fn fetch<T: DeserializeOwned>(self) -> Result<Vec<T>, DatabaseError> {
        let response = self.client.send(self.request(Method::GET)).await?;
        decode(response, &self.table).await
    }

    /// Exactly one row; [`DatabaseError::NotFound`] when nothing matches.
    #[instrument(skip(self), fields(table = %self.table))]
    pub async fn fetch_one<T: DeserializeOwned>(self) -> Result<T, DatabaseError> {
        let request = self.request(Method::GET).header(ACCEPT, SINGLE_OBJECT);
        let response = self.client.send(request).await?;
        decode(response, &self.table).await
    }

    /// The first matching row, if any.
    pub async fn fetch_optional<T: DeserializeOwned>(self) -> Result<Option<T>, DatabaseError> {
        let rows: Vec<T> = self.limit(1).fetch().await?;
        Ok(rows.into_iter().next())
    }

    /// Matching rows together with the exact total count ignoring limit/offset.
    #[instrument(skip(self), fields(table = %self.table))]
    pub async fn fetch_page<T: DeserializeOwned>(self) -> Result<Page<T>, DatabaseError> {
        let request = self.request(Method::GET).header(PREFER, "count=exact");
        let response = self.client.send(request).await?;
        let total = total_from_headers(response.headers());
        let items: Vec<T> = decode(response, &self.table).await?;
        let total = total.unwrap_or(items.len() as u64);
        Ok(Page { items, total })
    }

    /// Inserts one or many rows.
    #[instrument(skip(self, rows), fields(table = %self.table))]
    pub async fn insert<B, T>(self, rows: &B, returning: Returning) -> Result<Vec<T>, DatabaseError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(Method::POST).header(PREFER, returning.header()).json(rows);
        let response = self.client.send(request).await?;
        decode_rows(response, returning, &self.table).await
    }

    /// Inserts a single row and returns it as stored.
    #[instrument(skip(self, row), fields(table = %self.table))]
    pub async fn insert_one<B, T>(self, row: &B) -> Result<T, DatabaseError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .request(Method::POST)
            .header(PREFER, Returning::Representation.header())
            .header(ACCEPT, SINGLE_OBJECT)
            .json(row);
        let response = self.client.send(request).await?;
        decode(response, &self.table).await
    }

    /// Inserts or merges on the `on_conflict` columns.
    #[instrument(skip(self, rows), fields(table = %self.table))]
    pub async fn upsert<B>(self, rows: &B, on_conflict: &str) -> Result<(), DatabaseError>
    where
        B: Serialize + ?Sized,
    {
        let query = self.on_conflict(on_conflict);
        let request = query
            .request(Method::POST)
            .header(PREFER, "resolution=merge-duplicates,return=minimal")
            .json(rows);
        query.client.send(request).await.map(drop)
    }

    /// Inserts rows whose `on_conflict` key is new and returns only those.
    ///
    /// An empty result means every row already existed, which makes replays detectable.
    #[instrument(skip(self, rows), fields(table = %self.table))]
    pub async fn insert_new<B, T>(self, rows: &B, on_conflict: &str) -> Result<Vec<T>, DatabaseError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let query = self.on_conflict(on_conflict);
        let request = query
            .request(Method::POST)
            .header(PREFER, "resolution=ignore-duplicates,return=representation")
            .json(rows);
        let response = query.client.send(request).await?;
        decode(response, &query.table).await
    }

    /// Patches every matching row.
    #[instrument(skip(self, changes), fields(table = %self.table))]
    pub async fn update<B, T>(self, changes: &B, returning: Returning) -> Result<Vec<T>, DatabaseError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(Method::PATCH).header(PREFER, returning.header()).json(changes);
        let response = self.client.send(request).await?;
        decode_rows(response, returning, &self.table).await
    }

    #[instrument(skip(self), fields(table = %self.table))]
    pub async fn delete(self) -> Result<(), DatabaseError> {
        let request = self.request(Method::DELETE).header(PREFER, Returning::Minimal.header());
        self.client.send(request).await.map(drop)
    }

    fn on_conflict(mut self, columns: &str) -> Self {
        self.params.push(("on_conflict".to_owned(), columns.to_owned()));
        self
    }
}

async fn decode<T: DeserializeOwned>(response: Response, what: &str) -> Result<T, DatabaseError> {
    let bytes = response.bytes().await.context(format!("Reading {what}"))?;
    // void functions answer with an empty body
    let body: &[u8] = if bytes.is_empty() { b"null" } else { &bytes };
    serde_json::from_slice(body).context(format!("Decoding {what}"))
}

async fn decode_rows<T: DeserializeOwned>(
    response: Response,
    returning: Returning,
    what: &str,
) -> Result<Vec<T>, DatabaseError> {
    match returning {
        Returning::Minimal => Ok(Vec::new()),
        Returning::Representation => decode(response, what).await,
    }
}

/// Reads the total from `Content-Range: 0-23/120` (or `*/0`).
pub(crate) fn total_from_headers(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_RANGE)?
        .to_str()
        .ok()?
        .rsplit_once('/')
        .and_then(|(_, total)| total.parse().ok())
}

/// Error body returned by `PostgREST`.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
}

async fn error_from_response(response: Response) -> DatabaseError {
    let status = response.status();
    let raw = response.text().await.unwrap_or_default();
    let body: ErrorBody = serde_json::from_str(&raw).unwrap_or_default();
    debug!(%status, code = ?body.code, "PostgREST rejected request");
    classify(status, &body, &raw)
}

fn classify(status: StatusCode, body: &ErrorBody, raw: &str) -> DatabaseError {
    let message: Cow<'static, str> = match (&body.message, &body.details) {
        (Some(message), Some(details)) => format!("{message} ({details})").into(),
        (Some(message), None) => message.clone().into(),
        _ if raw.is_empty() => status.to_string().into(),
        _ => raw.to_owned().into(),
    };
    let context = body.code.clone().map(Cow::Owned);

    match (status, body.code.as_deref()) {
        (StatusCode::NOT_ACCEPTABLE | StatusCode::NOT_FOUND, _) | (_, Some("PGRST116")) => {
            DatabaseError::NotFound { message, context }
        },
        (StatusCode::CONFLICT, _) | (_, Some("23505" | "23503")) => {
            DatabaseError::Conflict { message, context }
        },
        (StatusCode::UNAUTHORIZED, _) | (_, Some("PGRST301" | "PGRST302")) => {
            DatabaseError::Unauthorized { message, context }
        },
        (StatusCode::FORBIDDEN, _) | (_, Some("42501")) => {
            DatabaseError::Forbidden { message, context }
        },
        (StatusCode::BAD_REQUEST, _) => DatabaseError::BadRequest { message, context },
        _ => DatabaseError::Upstream { status: status.as_u16(), message, context },
    }
}

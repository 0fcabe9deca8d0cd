use super::{Error, SessionCookieInterceptor};
use crate::todo::{TODO_DATATYPE, TodoItem};
use reqwest::Response;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, error, instrument, warn};
use url::Url;

/// Cloudant's default `_find` page size, sent explicitly so a short page marks
/// the end of the results.
const FIND_PAGE_SIZE: usize = 25;

/// Todo items in the user's remote database.
#[derive(Clone)]
pub struct TodoStore {
    database: Url,
    interceptor: SessionCookieInterceptor,
}

#[derive(Deserialize)]
struct FindReply {
    docs: Vec<Value>,
    #[serde(default)]
    bookmark: Option<String>,
}

#[derive(Deserialize)]
struct WriteReply {
    id: String,
    rev: String,
}

impl TodoStore {
    #[must_use]
    pub const fn new(database: Url, interceptor: SessionCookieInterceptor) -> Self {
        Self {
            database,
            interceptor,
        }
    }

    #[must_use]
    pub const fn database(&self) -> &Url {
        &self.database
    }

    #[must_use]
    pub const fn interceptor(&self) -> &SessionCookieInterceptor {
        &self.interceptor
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.database.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// All todo items, in database order, following `_find` bookmarks until
    /// the last page. Documents that are not valid todo items are skipped.
    ///
    /// # Errors
    /// Returns an error if any page of the query fails.
    #[instrument(skip(self), fields(database = %self.database))]
    pub async fn list(&self) -> Result<Vec<TodoItem>, Error> {
        let client = self.interceptor.client();
        let mut items = Vec::new();
        let mut bookmark: Option<String> = None;

        loop {
            let mut query = json!({
                "selector": { "@datatype": TODO_DATATYPE },
                "limit": FIND_PAGE_SIZE,
            });
            if let Some(bookmark) = &bookmark {
                query["bookmark"] = json!(bookmark);
            }

            let response = self
                .interceptor
                .execute(client.post(self.url(&["_find"])).json(&query))
                .await?;
            let reply: FindReply = read(response).await?;

            let page_len = reply.docs.len();
            items.extend(reply.docs.into_iter().filter_map(todo_item));

            let next = reply.bookmark.filter(|next| !next.is_empty());
            if page_len < FIND_PAGE_SIZE || next.is_none() || next == bookmark {
                break;
            }
            bookmark = next;
        }

        debug!("Loaded {} todo items", items.len());

        Ok(items)
    }

    /// Store a new item; the returned copy carries `_id` and `_rev`.
    ///
    /// # Errors
    /// Returns an error if the document is not accepted.
    #[instrument(skip(self, item), fields(name = %item.name))]
    pub async fn create(&self, item: &TodoItem) -> Result<TodoItem, Error> {
        let mut body = item.clone();
        body.id = None;
        body.rev = None;

        let client = self.interceptor.client();
        let response = self
            .interceptor
            .execute(client.post(self.url(&[])).json(&body))
            .await?;
        let reply: WriteReply = read(response).await?;

        body.id = Some(reply.id);
        body.rev = Some(reply.rev);

        Ok(body)
    }

    /// Save changes to a stored item; the returned copy carries the new `_rev`.
    ///
    /// # Errors
    /// Returns an error if the item was never stored or the update conflicts.
    #[instrument(skip(self, item), fields(name = %item.name))]
    pub async fn update(&self, item: &TodoItem) -> Result<TodoItem, Error> {
        let (id, _) = stored(item)?;

        let client = self.interceptor.client();
        let response = self
            .interceptor
            .execute(client.put(self.url(&[id])).json(item))
            .await?;
        let reply: WriteReply = read(response).await?;

        let mut updated = item.clone();
        updated.rev = Some(reply.rev);

        Ok(updated)
    }

    /// # Errors
    /// Returns an error if the item was never stored or the delete is refused.
    #[instrument(skip(self, item), fields(name = %item.name))]
    pub async fn delete(&self, item: &TodoItem) -> Result<(), Error> {
        let (id, rev) = stored(item)?;

        let client = self.interceptor.client();
        let response = self
            .interceptor
            .execute(client.delete(self.url(&[id])).query(&[("rev", rev)]))
            .await?;
        let _: Value = read(response).await?;

        Ok(())
    }
}

fn todo_item(doc: Value) -> Option<TodoItem> {
    let id = doc.get("_id").and_then(Value::as_str).map(str::to_string);

    serde_json::from_value(doc)
        .map_err(|e| warn!("Skipping document {id:?}: {e}"))
        .ok()
}

fn stored(item: &TodoItem) -> Result<(&str, &str), Error> {
    match (item.id.as_deref(), item.rev.as_deref()) {
        (Some(id), Some(rev)) => Ok((id, rev)),
        _ => Err(Error::NotStored(item.name.clone())),
    }
}

async fn read<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, Error> {
    let status = response.status();

    if !status.is_success() {
        let body: Value = response.json().await.unwrap_or_default();
        let reason = ["reason", "error"]
            .iter()
            .find_map(|key| body.get(key).and_then(Value::as_str))
            .unwrap_or_else(|| status.canonical_reason().unwrap_or_default())
            .to_string();

        let err = Error::Store {
            status: status.as_u16(),
            reason,
        };
        error!("{err}");
        return Err(err);
    }

    response.json().await.map_err(|e| Error::MalformedPayload {
        call: "store",
        message: e.to_string(),
    })
}

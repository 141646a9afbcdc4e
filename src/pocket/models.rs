use std::collections::HashMap;
use serde::{Deserialize, Serialize};
use url::Url;

/// A request code issued by Pocket together with the page the user must visit
/// to approve it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestCode {
    pub code: String,
    pub auth_url: Url,
}

/// The outcome of a successful request code exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessGrant {
    pub access_token: String,
    pub username: String,
}

/// A saved Pocket item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Article {
    pub item_id: String,
    pub url: String,
    pub title: String,
}

#[derive(Serialize)]
pub(crate) struct RequestCodeRequest<'a> {
    pub consumer_key: &'a str,
    pub redirect_uri: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct RequestCodeResponse {
    pub code: String,
}

#[derive(Serialize)]
pub(crate) struct AccessTokenRequest<'a> {
    pub consumer_key: &'a str,
    pub code: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct AccessTokenResponse {
    pub access_token: String,
    pub username: String,
}

#[derive(Serialize)]
pub(crate) struct RetrieveRequest<'a> {
    pub consumer_key: &'a str,
    pub access_token: &'a str,
    pub count: u32,
    #[serde(rename = "detailType")]
    pub detail_type: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct RetrieveResponse {
    #[serde(default)]
    pub list: ItemList,
}

/// Pocket sends `"list": {}` keyed by item id, but `"list": []` when empty.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum ItemList {
    Items(HashMap<String, RawItem>),
    Empty(Vec<RawItem>),
}

impl Default for ItemList {
    fn default() -> Self {
        ItemList::Empty(Vec::new())
    }
}

impl ItemList {
    pub fn into_articles(self) -> Vec<Article> {
        match self {
            ItemList::Items(items) => items.into_values().filter_map(RawItem::into_article).collect(),
            ItemList::Empty(items) => items.into_iter().filter_map(RawItem::into_article).collect(),
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct RawItem {
    pub item_id: String,
    #[serde(default)]
    pub resolved_url: Option<String>,
    #[serde(default)]
    pub given_url: Option<String>,
    #[serde(default)]
    pub resolved_title: Option<String>,
    #[serde(default)]
    pub given_title: Option<String>,
}

impl RawItem {
    /// Items Pocket could not resolve fall back to what the user saved.
    fn into_article(self) -> Option<Article> {
        let url = self
            .resolved_url
            .filter(|u| !u.is_empty())
            .or(self.given_url.filter(|u| !u.is_empty()))?;
        let title = self
            .resolved_title
            .filter(|t| !t.is_empty())
            .or(self.given_title)
            .unwrap_or_default();

        Some(Article {
            item_id: self.item_id,
            url,
            title,
        })
    }
}

#[derive(Serialize)]
pub(crate) struct ModifyRequest<'a> {
    pub consumer_key: &'a str,
    pub access_token: &'a str,
    pub actions: [ItemAction<'a>; 1],
}

#[derive(Serialize)]
pub(crate) struct ItemAction<'a> {
    pub action: &'a str,
    pub item_id: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct ModifyResponse {
    pub status: i64,
}

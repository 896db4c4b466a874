use serde::Deserialize;

pub const USER_FIELDS: &str = "id,name";
pub const PAGE_LIST_FIELDS: &str = "id,name,access_token,instagram_business_account";
pub const PAGE_INSIGHT_FIELDS: &str = "name,fan_count,followers_count";
pub const PAGE_LINK_FIELDS: &str = "instagram_business_account";
pub const INSTAGRAM_FIELDS: &str = "username,followers_count,media_count";

#[derive(Deserialize, Debug)]
pub struct LongLivedToken {
    pub access_token: String,
    pub expires_in: Option<u64>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Deserialize, Default)]
pub struct Accounts {
    #[serde(default)]
    pub data: Vec<Page>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Page {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub access_token: Option<String>,
    pub instagram_business_account: Option<LinkedAccount>,
}

impl Page {
    pub fn linked_account_id(&self) -> Option<&str> {
        self.instagram_business_account
            .as_ref()
            .map(|account| account.id.as_str())
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct LinkedAccount {
    pub id: String,
}

#[derive(Deserialize, Default)]
pub struct PageLink {
    pub instagram_business_account: Option<LinkedAccount>,
}

#[derive(Deserialize, Debug, Default)]
pub struct PageInsights {
    pub name: Option<String>,
    pub fan_count: Option<u64>,
    pub followers_count: Option<u64>,
}

#[derive(Deserialize, Debug, Default)]
pub struct InstagramInsights {
    pub username: Option<String>,
    pub followers_count: Option<u64>,
    pub media_count: Option<u64>,
}

use serde::{Deserialize, Serialize};

use crate::database::repository::Record;
use crate::database::store::Table;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub full_name: String,
    pub email: String,
    pub profile_image: Option<String>,
    /// Subject of the identity provider's token.
    pub clerk_identifier: String,
}

impl Record for User {
    const TABLE: Table = Table::Users;
}

/// Key-construction helpers for changelog collections stored in Redis.
///
/// Layout under a database:
/// - `{database}:{collection}:{id}`: one JSON document per entry
/// - `{database}:{collection}:_indexes`: set of unique field names
/// - `{database}:{collection}:_unique:{field}:{value}`: guard key holding the owning document id
#[derive(Debug, Clone)]
pub struct KeyContext<'a> {
    pub database: &'a str,
    pub collection: &'a str,
}

impl<'a> KeyContext<'a> {
    pub fn new(database: &'a str, collection: &'a str) -> Self {
        Self { database, collection }
    }

    pub fn document(&self, document_id: &str) -> String {
        format!("{}:{}:{}", self.database, self.collection, document_id)
    }

    pub fn indexes(&self) -> String {
        format!("{}:{}:_indexes", self.database, self.collection)
    }

    pub fn unique_guard(&self, field: &str, value: &str) -> String {
        format!("{}:{}:_unique:{}:{}", self.database, self.collection, field, value)
    }

    /// SCAN pattern matching every key of the collection, bookkeeping keys included.
    pub fn scan_pattern(&self) -> String {
        format!("{}:{}:*", self.database, self.collection)
    }

    /// True for document keys, false for index and guard keys.
    pub fn is_document_key(&self, key: &str) -> bool {
        let prefix = format!("{}:{}:", self.database, self.collection);
        match key.strip_prefix(&prefix) {
            Some(rest) => !rest.is_empty() && !rest.starts_with('_') && !rest.contains(':'),
            None => false,
        }
    }
}

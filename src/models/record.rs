//! Marketplace records: books for sale, exchange offers and study material.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

/// The kind of listing a record represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Book,
    Exchange,
    Material,
}

impl RecordKind {
    /// Every kind, in retrieval order
    pub const ALL: [RecordKind; 3] = [RecordKind::Book, RecordKind::Exchange, RecordKind::Material];

    /// Returns the type tag used in result items
    pub fn id(&self) -> &'static str {
        match self {
            RecordKind::Book => "book",
            RecordKind::Exchange => "exchange",
            RecordKind::Material => "material",
        }
    }

    /// Returns the store collection holding this kind
    pub fn collection(&self) -> &'static str {
        match self {
            RecordKind::Book => "books",
            RecordKind::Exchange => "exchanges",
            RecordKind::Material => "materials",
        }
    }

    /// Returns the display name of the kind
    pub fn name(&self) -> &'static str {
        match self {
            RecordKind::Book => "For Sale",
            RecordKind::Exchange => "Exchange",
            RecordKind::Material => "Study Material",
        }
    }

    fn flag(self) -> KindSet {
        match self {
            RecordKind::Book => KindSet::BOOK,
            RecordKind::Exchange => KindSet::EXCHANGE,
            RecordKind::Material => KindSet::MATERIAL,
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Error returned when a string names no record kind
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown record kind: {0}")]
pub struct UnknownRecordKind(pub String);

impl FromStr for RecordKind {
    type Err = UnknownRecordKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "book" | "books" => Ok(RecordKind::Book),
            "exchange" | "exchanges" => Ok(RecordKind::Exchange),
            "material" | "materials" => Ok(RecordKind::Material),
            _ => Err(UnknownRecordKind(s.to_string())),
        }
    }
}

bitflags::bitflags! {
    /// Set of record kinds a retrieval draws from
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct KindSet: u8 {
        const BOOK = 1 << 0;
        const EXCHANGE = 1 << 1;
        const MATERIAL = 1 << 2;
    }
}

impl KindSet {
    /// Kinds in the set, in retrieval order
    pub fn kinds(self) -> impl Iterator<Item = RecordKind> {
        RecordKind::ALL
            .into_iter()
            .filter(move |kind| self.contains(kind.flag()))
    }
}

/// Physical condition of a book listed for sale
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookCondition {
    #[serde(rename = "New")]
    New,
    #[serde(rename = "Like New")]
    LikeNew,
    Good,
    Fair,
    Poor,
    #[serde(untagged)]
    Other(String),
}

impl BookCondition {
    /// Returns the label stored in listings
    pub fn name(&self) -> &str {
        match self {
            BookCondition::New => "New",
            BookCondition::LikeNew => "Like New",
            BookCondition::Good => "Good",
            BookCondition::Fair => "Fair",
            BookCondition::Poor => "Poor",
            BookCondition::Other(s) => s,
        }
    }
}

impl std::fmt::Display for BookCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for BookCondition {
    type Err = std::convert::Infallible;

    /// Labels compare exactly; anything unrecognised is kept verbatim.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "New" => BookCondition::New,
            "Like New" => BookCondition::LikeNew,
            "Good" => BookCondition::Good,
            "Fair" => BookCondition::Fair,
            "Poor" => BookCondition::Poor,
            other => BookCondition::Other(other.to_string()),
        })
    }
}

/// Attributes every listing carries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecordMeta {
    /// Document identifier, unique within its collection
    #[serde(skip_deserializing)]
    pub id: String,

    /// When the listing was created
    #[serde(deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,

    /// Owner display name
    pub user_name: Option<String>,

    /// Owner email
    pub user_email: Option<String>,
}

/// A book listed for sale
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub title: Option<String>,
    pub subject: Option<String>,
    #[serde(rename = "class")]
    pub class_label: Option<String>,
    pub board: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub price: Option<f64>,
    pub condition: Option<BookCondition>,
    pub description: Option<String>,
    /// Listing status (`available`, `sold`, ...)
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub views: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub downloads: Option<u64>,
}

impl Book {
    /// Create an empty book listing with the given id
    pub fn new(id: impl Into<String>) -> Self {
        let mut book = Self::default();
        book.meta.id = id.into();
        book
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn class_label(mut self, class_label: impl Into<String>) -> Self {
        self.class_label = Some(class_label.into());
        self
    }

    pub fn board(mut self, board: impl Into<String>) -> Self {
        self.board = Some(board.into());
        self
    }

    pub fn price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn condition(mut self, condition: BookCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn views(mut self, views: u64) -> Self {
        self.views = Some(views);
        self
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.meta.created_at = Some(at);
        self
    }

    pub fn owner(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.meta.user_name = Some(name.into());
        self.meta.user_email = Some(email.into());
        self
    }
}

/// An offer to swap one book for another
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exchange {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub have_book: Option<String>,
    pub need_book: Option<String>,
    pub have_class: Option<String>,
    pub need_class: Option<String>,
    pub have_board: Option<String>,
    pub need_board: Option<String>,
    pub notes: Option<String>,
}

impl Exchange {
    /// Create an exchange offer trading `have` for `need`
    pub fn new(id: impl Into<String>, have: impl Into<String>, need: impl Into<String>) -> Self {
        let mut exchange = Self::default();
        exchange.meta.id = id.into();
        exchange.have_book = Some(have.into());
        exchange.need_book = Some(need.into());
        exchange
    }

    pub fn classes(mut self, have: impl Into<String>, need: impl Into<String>) -> Self {
        self.have_class = Some(have.into());
        self.need_class = Some(need.into());
        self
    }

    pub fn boards(mut self, have: impl Into<String>, need: impl Into<String>) -> Self {
        self.have_board = Some(have.into());
        self.need_board = Some(need.into());
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.meta.created_at = Some(at);
        self
    }
}

/// Shared study material (notes, papers, guides)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub title: Option<String>,
    pub subject: Option<String>,
    #[serde(rename = "class")]
    pub class_label: Option<String>,
    pub doc_type: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub downloads: Option<u64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub rating: Option<f64>,
}

impl Material {
    /// Create a material listing with the given id and title
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        let mut material = Self::default();
        material.meta.id = id.into();
        material.title = Some(title.into());
        material
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn class_label(mut self, class_label: impl Into<String>) -> Self {
        self.class_label = Some(class_label.into());
        self
    }

    pub fn doc_type(mut self, doc_type: impl Into<String>) -> Self {
        self.doc_type = Some(doc_type.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.meta.created_at = Some(at);
        self
    }
}

/// One marketplace listing of any kind
///
/// The variant decides which attributes exist. Accessors return `None` for
/// attributes the variant does not carry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Record {
    Book(Book),
    Exchange(Exchange),
    Material(Material),
}

impl Record {
    /// Decode a stored document of the given kind
    pub fn decode(
        kind: RecordKind,
        id: &str,
        fields: serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self, serde_json::Error> {
        let value = serde_json::Value::Object(fields);
        let mut record = match kind {
            RecordKind::Book => Record::Book(serde_json::from_value(value)?),
            RecordKind::Exchange => Record::Exchange(serde_json::from_value(value)?),
            RecordKind::Material => Record::Material(serde_json::from_value(value)?),
        };
        record.meta_mut().id = id.to_string();
        Ok(record)
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Book(_) => RecordKind::Book,
            Record::Exchange(_) => RecordKind::Exchange,
            Record::Material(_) => RecordKind::Material,
        }
    }

    pub fn meta(&self) -> &RecordMeta {
        match self {
            Record::Book(b) => &b.meta,
            Record::Exchange(e) => &e.meta,
            Record::Material(m) => &m.meta,
        }
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        match self {
            Record::Book(b) => &mut b.meta,
            Record::Exchange(e) => &mut e.meta,
            Record::Material(m) => &mut m.meta,
        }
    }

    pub fn id(&self) -> &str {
        &self.meta().id
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.meta().created_at
    }

    /// Headline text: the title, or the offered book for exchanges
    pub fn title(&self) -> Option<&str> {
        match self {
            Record::Book(b) => b.title.as_deref(),
            Record::Exchange(e) => e.have_book.as_deref(),
            Record::Material(m) => m.title.as_deref(),
        }
    }

    /// Class label; exchanges carry have/need classes instead
    pub fn class_label(&self) -> Option<&str> {
        match self {
            Record::Book(b) => b.class_label.as_deref(),
            Record::Material(m) => m.class_label.as_deref(),
            Record::Exchange(_) => None,
        }
    }

    /// Examination board; only books carry one
    pub fn board(&self) -> Option<&str> {
        match self {
            Record::Book(b) => b.board.as_deref(),
            Record::Exchange(_) | Record::Material(_) => None,
        }
    }

    pub fn price(&self) -> Option<f64> {
        match self {
            Record::Book(b) => b.price,
            Record::Exchange(_) | Record::Material(_) => None,
        }
    }

    pub fn views(&self) -> Option<u64> {
        match self {
            Record::Book(b) => b.views,
            Record::Exchange(_) | Record::Material(_) => None,
        }
    }
}

impl From<Book> for Record {
    fn from(book: Book) -> Self {
        Record::Book(book)
    }
}

impl From<Exchange> for Record {
    fn from(exchange: Exchange) -> Self {
        Record::Exchange(exchange)
    }
}

impl From<Material> for Record {
    fn from(material: Material) -> Self {
        Record::Material(material)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TimestampRepr {
    Text(String),
    Millis(i64),
    Float(f64),
    Parts {
        #[serde(alias = "_seconds")]
        seconds: i64,
        #[serde(default, alias = "_nanoseconds")]
        nanoseconds: u32,
    },
}

/// Accepts RFC 3339 strings, epoch milliseconds, or exported
/// `{seconds, nanoseconds}` timestamps. Unparseable text reads as absent.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<TimestampRepr> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(TimestampRepr::Text(s)) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        Some(TimestampRepr::Millis(ms)) => Utc.timestamp_millis_opt(ms).single(),
        Some(TimestampRepr::Float(ms)) => Utc.timestamp_millis_opt(ms as i64).single(),
        Some(TimestampRepr::Parts {
            seconds,
            nanoseconds,
        }) => Utc.timestamp_opt(seconds, nanoseconds).single(),
        None => None,
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberRepr {
    Number(f64),
    Text(String),
}

impl NumberRepr {
    fn into_f64(self) -> Option<f64> {
        match self {
            NumberRepr::Number(n) => Some(n),
            NumberRepr::Text(s) => s.trim().parse::<f64>().ok(),
        }
        .filter(|n| n.is_finite())
    }
}

/// Prices come from form inputs and may be stored as strings.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<NumberRepr> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(NumberRepr::into_f64))
}

fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<NumberRepr> = Option::deserialize(deserializer)?;
    Ok(raw
        .and_then(NumberRepr::into_f64)
        .filter(|n| *n >= 0.0)
        .map(|n| n as u64))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TagsRepr {
    One(String),
    Many(Vec<String>),
}

fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<TagsRepr> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(TagsRepr::One(tag)) => vec![tag],
        Some(TagsRepr::Many(tags)) => tags,
        None => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_decode_book_with_lenient_fields() {
        let record = Record::decode(
            RecordKind::Book,
            "b1",
            fields(json!({
                "title": "Algebra II",
                "class": "Class 10",
                "board": "CBSE",
                "price": "250",
                "condition": "Like New",
                "status": "available",
                "createdAt": "2024-03-01T10:00:00Z",
                "views": 12,
                "userName": "asha"
            })),
        )
        .unwrap();

        assert_eq!(record.kind(), RecordKind::Book);
        assert_eq!(record.id(), "b1");
        assert_eq!(record.price(), Some(250.0));
        assert_eq!(record.class_label(), Some("Class 10"));
        assert_eq!(record.views(), Some(12));
        match &record {
            Record::Book(book) => assert_eq!(book.condition, Some(BookCondition::LikeNew)),
            other => panic!("unexpected variant: {:?}", other),
        }
        assert_eq!(
            record.created_at().map(|t| t.to_rfc3339()),
            Some("2024-03-01T10:00:00+00:00".to_string())
        );
    }

    #[test]
    fn test_decode_unknown_condition_is_kept() {
        let record = Record::decode(
            RecordKind::Book,
            "b2",
            fields(json!({ "condition": "Excellent" })),
        )
        .unwrap();
        match record {
            Record::Book(book) => assert_eq!(
                book.condition,
                Some(BookCondition::Other("Excellent".to_string()))
            ),
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn test_decode_timestamp_forms() {
        let millis = Record::decode(
            RecordKind::Exchange,
            "e1",
            fields(json!({ "createdAt": 1_700_000_000_000_i64 })),
        )
        .unwrap();
        assert_eq!(millis.created_at().map(|t| t.timestamp()), Some(1_700_000_000));

        let parts = Record::decode(
            RecordKind::Exchange,
            "e2",
            fields(json!({ "createdAt": { "seconds": 1_700_000_000_i64, "nanoseconds": 0 } })),
        )
        .unwrap();
        assert_eq!(parts.created_at().map(|t| t.timestamp()), Some(1_700_000_000));

        let garbage = Record::decode(
            RecordKind::Exchange,
            "e3",
            fields(json!({ "createdAt": "last tuesday" })),
        )
        .unwrap();
        assert_eq!(garbage.created_at(), None);
    }

    #[test]
    fn test_decode_material_tags() {
        let single = Record::decode(
            RecordKind::Material,
            "m1",
            fields(json!({ "title": "Notes", "tags": "physics" })),
        )
        .unwrap();
        let list = Record::decode(
            RecordKind::Material,
            "m2",
            fields(json!({ "title": "Notes", "tags": ["physics", "optics"] })),
        )
        .unwrap();

        match (single, list) {
            (Record::Material(a), Record::Material(b)) => {
                assert_eq!(a.tags, vec!["physics"]);
                assert_eq!(b.tags, vec!["physics", "optics"]);
            }
            other => panic!("unexpected variants: {:?}", other),
        }
    }

    #[test]
    fn test_variant_only_accessors() {
        let exchange: Record = Exchange::new("e1", "Physics 11", "Chemistry 11")
            .classes("Class 11", "Class 11")
            .into();
        assert_eq!(exchange.class_label(), None);
        assert_eq!(exchange.board(), None);
        assert_eq!(exchange.price(), None);
        assert_eq!(exchange.title(), Some("Physics 11"));

        let material: Record = Material::new("m1", "Optics notes").class_label("12").into();
        assert_eq!(material.class_label(), Some("12"));
        assert_eq!(material.board(), None);
    }

    #[test]
    fn test_record_serializes_type_tag() {
        let record: Record = Book::new("b1").title("Algebra").price(100.0).into();
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["type"], "book");
        assert_eq!(value["id"], "b1");
        assert_eq!(value["title"], "Algebra");
    }

    #[test]
    fn test_kind_set_order() {
        let kinds: Vec<_> = KindSet::all().kinds().collect();
        assert_eq!(kinds, RecordKind::ALL.to_vec());
        let books: Vec<_> = KindSet::BOOK.kinds().collect();
        assert_eq!(books, vec![RecordKind::Book]);
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("Books".parse::<RecordKind>(), Ok(RecordKind::Book));
        assert!("course".parse::<RecordKind>().is_err());
    }
}

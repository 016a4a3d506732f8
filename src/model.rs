//! Book records and the values the lookups produce for them.

/// How a book was named in the input list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    /// Catalog item id taken from an item page URL.
    ItemId(u64),
    /// Bare ISBN-13.
    Isbn13(String),
}

/// Institutional holding status of a book.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Ownership {
    /// The library holds the book. The keys identify the holding on the
    /// library's detail page and are only meaningful together.
    Present {
        book_key: Option<String>,
        species_key: Option<String>,
    },
    /// The library answered and does not hold the book.
    Absent,
    /// The lookup did not run or failed.
    #[default]
    Unknown,
}

impl Ownership {
    /// Both reference keys, when the holding can be linked to.
    pub fn reference_keys(&self) -> Option<(&str, &str)> {
        match self {
            Ownership::Present {
                book_key: Some(book_key),
                species_key: Some(species_key),
            } => Some((book_key, species_key)),
            _ => None,
        }
    }

    /// Single-character marker used when the holding cannot be linked.
    pub fn marker(&self) -> &'static str {
        match self {
            Ownership::Present { .. } => "O",
            Ownership::Absent => "X",
            Ownership::Unknown => "?",
        }
    }
}

/// Everything one successful catalog lookup yields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogEntry {
    pub item_id: Option<u64>,
    pub isbn13: String,
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub standard_price: i64,
    pub publish_date: String,
    pub description: String,
    pub category: String,
    pub rating_score: f64,
    pub rating_count: u64,
    pub sales_index: u64,
    pub cover: Option<Vec<u8>>,
}

/// One book from the input list, enriched in place by the lookups.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookRecord {
    pub item_id: Option<u64>,
    pub isbn13: Option<String>,
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub standard_price: i64,
    pub publish_date: String,
    pub description: String,
    pub category: String,
    pub rating_score: f64,
    pub rating_count: u64,
    pub sales_index: u64,
    pub cover: Option<Vec<u8>>,
    pub ownership: Ownership,
    pub memo: String,
    sheet_name: String,
    display_order: usize,
}

impl BookRecord {
    /// Creates a record for one input row.
    pub fn new(
        identifier: Identifier,
        sheet_name: impl Into<String>,
        memo: impl Into<String>,
        display_order: usize,
    ) -> Self {
        let (item_id, isbn13) = match identifier {
            Identifier::ItemId(id) => (Some(id), None),
            Identifier::Isbn13(isbn) => (None, Some(isbn)),
        };
        Self {
            item_id,
            isbn13,
            memo: memo.into(),
            sheet_name: sheet_name.into(),
            display_order,
            ..Self::default()
        }
    }

    /// Sheet the record is written to.
    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    /// Position of the record within its sheet.
    pub fn display_order(&self) -> usize {
        self.display_order
    }

    /// ISBN-13 if known and non-empty.
    pub fn isbn13(&self) -> Option<&str> {
        self.isbn13.as_deref().filter(|isbn| !isbn.is_empty())
    }

    /// Short label used in log fields.
    pub fn label(&self) -> String {
        match (self.isbn13(), self.item_id) {
            (Some(isbn), _) => isbn.to_string(),
            (None, Some(id)) => format!("ItemId {id}"),
            (None, None) => String::from("<unidentified>"),
        }
    }

    /// Replaces every descriptive and popularity field with the entry's
    /// values. Identity fields are only overwritten with known values.
    pub fn apply_catalog(&mut self, entry: CatalogEntry) {
        if entry.item_id.is_some() {
            self.item_id = entry.item_id;
        }
        if !entry.isbn13.is_empty() {
            self.isbn13 = Some(entry.isbn13);
        }
        self.title = entry.title;
        self.author = entry.author;
        self.publisher = entry.publisher;
        self.standard_price = entry.standard_price;
        self.publish_date = entry.publish_date;
        self.description = entry.description;
        self.category = entry.category;
        self.rating_score = entry.rating_score;
        self.rating_count = entry.rating_count;
        self.sales_index = entry.sales_index;
        self.cover = entry.cover;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_starts_unknown_and_empty() {
        let record = BookRecord::new(Identifier::ItemId(7), "Fiction", "", 3);
        assert_eq!(record.item_id, Some(7));
        assert_eq!(record.isbn13(), None);
        assert_eq!(record.ownership, Ownership::Unknown);
        assert!(record.title.is_empty());
        assert_eq!(record.standard_price, 0);
        assert_eq!(record.sheet_name(), "Fiction");
        assert_eq!(record.display_order(), 3);
    }

    #[test]
    fn apply_catalog_fills_identity_from_response() {
        let mut record = BookRecord::new(Identifier::ItemId(42), "A", "memo", 0);
        record.apply_catalog(CatalogEntry {
            item_id: Some(42),
            isbn13: "9788936434120".into(),
            title: "소년이 온다".into(),
            standard_price: 15000,
            ..CatalogEntry::default()
        });
        assert_eq!(record.isbn13(), Some("9788936434120"));
        assert_eq!(record.title, "소년이 온다");
        assert_eq!(record.memo, "memo");
        assert_eq!(record.sheet_name(), "A");
    }

    #[test]
    fn apply_catalog_keeps_known_isbn_when_response_has_none() {
        let mut record = BookRecord::new(Identifier::Isbn13("9791190123456".into()), "A", "", 0);
        record.apply_catalog(CatalogEntry {
            item_id: Some(1),
            ..CatalogEntry::default()
        });
        assert_eq!(record.isbn13(), Some("9791190123456"));
        assert_eq!(record.item_id, Some(1));
    }

    #[test]
    fn reference_keys_require_both() {
        let linked = Ownership::Present {
            book_key: Some("1".into()),
            species_key: Some("2".into()),
        };
        let partial = Ownership::Present {
            book_key: Some("1".into()),
            species_key: None,
        };
        assert_eq!(linked.reference_keys(), Some(("1", "2")));
        assert_eq!(partial.reference_keys(), None);
        assert_eq!(partial.marker(), "O");
        assert_eq!(Ownership::Absent.marker(), "X");
        assert_eq!(Ownership::Unknown.marker(), "?");
    }
}

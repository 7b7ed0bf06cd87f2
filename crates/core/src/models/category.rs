use serde::{Deserialize, Serialize};

/// Category label of a subscription.
///
/// Serialized as its display label, so stored data reads the same as what
/// the category selector shows. Labels outside the fixed set survive a
/// round trip as [`Category::Custom`].
///
/// Ordering follows the selector order; custom labels sort last, by label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    /// エンターテイメント
    Entertainment,
    /// ビジネス
    Business,
    /// ヘルス・フィットネス
    HealthFitness,
    /// 教育
    Education,
    /// ユーティリティ
    Utilities,
    /// その他
    Other,
    /// Any label not in the fixed set
    Custom(String),
}

impl Category {
    /// The fixed selector choices, in display order.
    pub const ALL: [Category; 6] = [
        Category::Entertainment,
        Category::Business,
        Category::HealthFitness,
        Category::Education,
        Category::Utilities,
        Category::Other,
    ];

    pub fn label(&self) -> &str {
        match self {
            Category::Entertainment => "エンターテイメント",
            Category::Business => "ビジネス",
            Category::HealthFitness => "ヘルス・フィットネス",
            Category::Education => "教育",
            Category::Utilities => "ユーティリティ",
            Category::Other => "その他",
            Category::Custom(label) => label,
        }
    }

    /// Map a label to its category. Surrounding whitespace is ignored.
    pub fn from_label(label: &str) -> Self {
        let trimmed = label.trim();
        Self::ALL
            .iter()
            .find(|c| c.label() == trimmed)
            .cloned()
            .unwrap_or_else(|| Category::Custom(trimmed.to_string()))
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, Category::Custom(_))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl From<String> for Category {
    fn from(label: String) -> Self {
        Category::from_label(&label)
    }
}

impl From<&str> for Category {
    fn from(label: &str) -> Self {
        Category::from_label(label)
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.label().to_string()
    }
}

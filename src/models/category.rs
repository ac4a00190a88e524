use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// A user-defined classification label with an optional description.
///
/// The name is cleaned on construction: surrounding whitespace is trimmed and
/// leading `#` markers are stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    name: String,
    description: String,
}

impl Category {
    /// Creates a category, cleaning the name.
    ///
    /// # Examples
    ///
    /// ```
    /// use pretzel::Category;
    ///
    /// let category = Category::new("##Soil ", "land-related");
    /// assert_eq!(category.name(), "Soil");
    /// assert_eq!(category.description(), "land-related");
    /// ```
    pub fn new(name: &str, description: impl Into<String>) -> Self {
        Self {
            name: clean_category_name(name),
            description: description.into().trim().to_string(),
        }
    }

    /// Creates a category without a description.
    pub fn named(name: &str) -> Self {
        Self::new(name, String::new())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the description, or an empty string when none was given.
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn has_description(&self) -> bool {
        !self.description.is_empty()
    }
}

/// Trims a raw category name and strips any leading `#` characters.
pub fn clean_category_name(raw: &str) -> String {
    raw.trim().trim_start_matches('#').trim().to_string()
}

/// Ordered, name-unique collection of categories.
///
/// Iteration order is file order. It decides both the prompt order and the
/// order of category labels in the output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategorySet {
    categories: Vec<Category>,
}

impl CategorySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a category, replacing the description of an existing category
    /// with the same name in place.
    ///
    /// Returns `false` when a category with the same name already existed.
    /// Categories with an empty name after cleaning are ignored and also
    /// return `false`.
    pub fn insert(&mut self, category: Category) -> bool {
        if category.name.is_empty() {
            return false;
        }
        match self.categories.iter_mut().find(|c| c.name == category.name) {
            Some(existing) => {
                existing.description = category.description;
                false
            }
            None => {
                self.categories.push(category);
                true
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Category> {
        self.categories.iter()
    }

    /// Returns the category names in iteration order.
    pub fn names(&self) -> Vec<&str> {
        self.categories.iter().map(Category::name).collect()
    }
}

impl FromIterator<Category> for CategorySet {
    fn from_iter<I: IntoIterator<Item = Category>>(iter: I) -> Self {
        let mut set = Self::new();
        for category in iter {
            set.insert(category);
        }
        set
    }
}

impl<'a> IntoIterator for &'a CategorySet {
    type Item = &'a Category;
    type IntoIter = std::slice::Iter<'a, Category>;

    fn into_iter(self) -> Self::IntoIter {
        self.categories.iter()
    }
}

/// Serializes as a JSON object of `name -> description`, the same shape the
/// category loader accepts.
impl Serialize for CategorySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.categories.len()))?;
        for category in &self.categories {
            map.serialize_entry(category.name(), category.description())?;
        }
        map.end()
    }
}

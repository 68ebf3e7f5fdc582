//! Resource domains and the tagged union stored in the cache.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::entities::{Article, Category, Collection};

/// A REST resource collection served under `/{domain}/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Articles,
    Categories,
    Collections,
}

impl Domain {
    pub const ALL: [Domain; 3] = [Domain::Articles, Domain::Categories, Domain::Collections];

    /// Path segment and key prefix for this domain.
    pub fn as_str(self) -> &'static str {
        match self {
            Domain::Articles => "articles",
            Domain::Categories => "categories",
            Domain::Collections => "collections",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDomain(pub String);

impl fmt::Display for UnknownDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown resource domain `{}`", self.0)
    }
}

impl std::error::Error for UnknownDomain {}

impl FromStr for Domain {
    type Err = UnknownDomain;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Domain::ALL
            .into_iter()
            .find(|domain| domain.as_str() == value)
            .ok_or_else(|| UnknownDomain(value.to_string()))
    }
}

/// One canonical entity of any domain.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Resource {
    Article(Article),
    Category(Category),
    Collection(Collection),
}

impl Resource {
    pub fn domain(&self) -> Domain {
        match self {
            Resource::Article(_) => Domain::Articles,
            Resource::Category(_) => Domain::Categories,
            Resource::Collection(_) => Domain::Collections,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Resource::Article(article) => &article.id,
            Resource::Category(category) => &category.id,
            Resource::Collection(collection) => &collection.id,
        }
    }

    pub fn slug(&self) -> &str {
        match self {
            Resource::Article(article) => &article.slug,
            Resource::Category(category) => &category.slug,
            Resource::Collection(collection) => &collection.slug,
        }
    }
}

/// A canonical entity type bound to exactly one domain.
pub trait Canonical: Clone + Send + Sync + 'static {
    const DOMAIN: Domain;

    fn into_resource(self) -> Resource;

    /// Returns `None` when the resource belongs to another domain.
    fn from_resource(resource: Resource) -> Option<Self>;
}

impl Canonical for Article {
    const DOMAIN: Domain = Domain::Articles;

    fn into_resource(self) -> Resource {
        Resource::Article(self)
    }

    fn from_resource(resource: Resource) -> Option<Self> {
        match resource {
            Resource::Article(article) => Some(article),
            _ => None,
        }
    }
}

impl Canonical for Category {
    const DOMAIN: Domain = Domain::Categories;

    fn into_resource(self) -> Resource {
        Resource::Category(self)
    }

    fn from_resource(resource: Resource) -> Option<Self> {
        match resource {
            Resource::Category(category) => Some(category),
            _ => None,
        }
    }
}

impl Canonical for Collection {
    const DOMAIN: Domain = Domain::Collections;

    fn into_resource(self) -> Resource {
        Resource::Collection(self)
    }

    fn from_resource(resource: Resource) -> Option<Self> {
        match resource {
            Resource::Collection(collection) => Some(collection),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_parses_from_path_segment() {
        assert_eq!("categories".parse::<Domain>(), Ok(Domain::Categories));
        assert_eq!(
            "tags".parse::<Domain>(),
            Err(UnknownDomain("tags".to_string()))
        );
    }

    #[test]
    fn resource_conversion_rejects_other_domains() {
        let category = Category {
            id: "7".to_string(),
            name: "Energy".to_string(),
            slug: "energy".to_string(),
            description: None,
            article_count: 0,
            created_at: None,
            updated_at: None,
        };
        let resource = category.clone().into_resource();

        assert_eq!(resource.domain(), Domain::Categories);
        assert_eq!(resource.id(), "7");
        assert!(Article::from_resource(resource.clone()).is_none());
        assert_eq!(Category::from_resource(resource), Some(category));
    }
}

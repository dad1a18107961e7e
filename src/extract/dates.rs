use scraper::{Html, Selector};

pub const UNKNOWN_DATE: &str = "unknown";

/// `<meta name|property>` values that carry a release/publication date, in
/// scan order. Later matches override earlier ones.
pub const RELEASE_DATE_NAMES: &[&str] = &[
    "date",
    "pubdate",
    "publishdate",
    "OriginalPublicationDate",
    "article:published_time",
    "sailthru.date",
    "article.published",
    "published-date",
    "og:published_time",
    "publication_date",
    "publishedDate",
    "dc.date",
    "DC.date",
    "article:published",
    "article_date_original",
    "cXenseParse:recs:publishtime",
    "DATE_PUBLISHED",
    "pub-date",
    "pub_date",
    "datePublished",
    "date_published",
    "time_published",
    "article:published_date",
    "parsely-pub-date",
    "publish-date",
    "pubdatetime",
    "published_time",
    "publishedtime",
    "article_date",
    "created_date",
    "published_at",
    "lastPublishedDate",
    "og:published_time",
    "og:release_date",
    "article:published_time",
    "og:publication_date",
    "og:pubdate",
    "article:publication_date",
    "product:availability_starts",
    "product:release_date",
    "event:start_date",
    "event:release_date",
    "og:time_published",
    "og:start_date",
    "og:created",
    "og:creation_date",
    "og:launch_date",
    "og:first_published",
    "og:original_publication_date",
    "article:published",
    "article:pub_date",
    "news:published_time",
    "news:publication_date",
    "blog:published_time",
    "blog:publication_date",
    "report:published_time",
    "report:publication_date",
    "webpage:published_time",
    "webpage:publication_date",
    "post:published_time",
    "post:publication_date",
    "item:published_time",
    "item:publication_date",
];

/// Same as [`RELEASE_DATE_NAMES`] for modification/update dates.
pub const UPDATE_DATE_NAMES: &[&str] = &[
    "lastmod",
    "lastmodified",
    "last-modified",
    "updated",
    "dateModified",
    "article:modified_time",
    "modified_date",
    "article:modified",
    "og:updated_time",
    "mod_date",
    "modifiedDate",
    "lastModifiedDate",
    "lastUpdate",
    "last_updated",
    "LastUpdated",
    "UpdateDate",
    "updated_date",
    "revision_date",
    "sentry:revision",
    "article:modified_date",
    "date_updated",
    "time_updated",
    "lastUpdatedDate",
    "last-update-date",
    "lastupdate",
    "dateLastModified",
    "article:update_time",
    "modified_time",
    "last_modified_date",
    "date_last_modified",
    "og:updated_time",
    "og:modified_time",
    "article:modified_time",
    "og:modification_date",
    "og:mod_time",
    "article:modification_date",
    "product:availability_ends",
    "product:modified_date",
    "event:end_date",
    "event:updated_date",
    "og:time_modified",
    "og:end_date",
    "og:last_modified",
    "og:modification_date",
    "og:revision_date",
    "og:last_updated",
    "og:most_recent_update",
    "article:updated",
    "article:mod_date",
    "news:updated_time",
    "news:modification_date",
    "blog:updated_time",
    "blog:modification_date",
    "report:updated_time",
    "report:modification_date",
    "webpage:updated_time",
    "webpage:modification_date",
    "post:updated_time",
    "post:modification_date",
    "item:updated_time",
    "item:modification_date",
];

struct MetaTag<'a> {
    name: Option<&'a str>,
    property: Option<&'a str>,
    content: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageDates {
    pub release: String,
    pub modified: String,
}

pub fn page_dates(doc: &Html) -> PageDates {
    let metas = collect_meta(doc);
    PageDates {
        release: scan(&metas, RELEASE_DATE_NAMES),
        modified: scan(&metas, UPDATE_DATE_NAMES),
    }
}

fn collect_meta(doc: &Html) -> Vec<MetaTag<'_>> {
    let Ok(selector) = Selector::parse("meta") else {
        return Vec::new();
    };
    doc.select(&selector)
        .filter_map(|el| {
            let attrs = el.value();
            let content = attrs.attr("content")?.trim();
            if content.is_empty() {
                return None;
            }
            Some(MetaTag {
                name: attrs.attr("name"),
                property: attrs.attr("property"),
                content,
            })
        })
        .collect()
}

/// Walks `names` in order; for each name the first tag matching by `name`
/// (then by `property`) is taken, and the last name with a match wins.
fn scan(metas: &[MetaTag<'_>], names: &[&str]) -> String {
    let mut found = None;
    for name in names {
        let hit = metas
            .iter()
            .find(|m| m.name == Some(*name))
            .or_else(|| metas.iter().find(|m| m.property == Some(*name)));
        if let Some(meta) = hit {
            found = Some(meta.content);
        }
    }
    found.unwrap_or(UNKNOWN_DATE).to_string()
}

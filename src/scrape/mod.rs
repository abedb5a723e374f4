//! Structural rules for the portal's markup.
//!
//! Selectors are compiled once per scraper; `scraper::Html` is not `Send`, so
//! every document is parsed and dropped inside a single synchronous call.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

use crate::domain::{Course, ResourceFile, Result, SyncError};
use crate::utils::sanitize_course_name;

const UNKNOWN_COURSE: &str = "Unknown-Course";
const UNTITLED: &str = "untitled";

/// Extracts typed entities from rendered portal pages.
pub trait PageScraper: Send + Sync {
    /// Courses listed on the catalog page.
    fn parse_courses(&self, html: &str) -> Result<Vec<Course>>;

    /// Resource files of a course page.
    ///
    /// Returns `None` while the resource list has not materialized yet, so a
    /// caller polling a live page can tell "not loaded" from "loaded".
    fn find_resources(&self, html: &str, page_url: &str) -> Result<Option<Vec<ResourceFile>>>;
}

pub struct PortalScraper {
    course_card: Selector,
    course_link: Selector,
    course_label: Selector,
    course_id: Regex,
    resource_item: Selector,
    resource_title: Selector,
    resource_link: Selector,
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| SyncError::Scrape(format!("bad selector {css:?}: {e}")))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

impl PortalScraper {
    pub fn new() -> Result<Self> {
        Ok(Self {
            course_card: selector("div.course-card")?,
            course_link: selector("a")?,
            course_label: selector(".course-id")?,
            course_id: Regex::new(r"/studio/([^/?#]+)")
                .map_err(|e| SyncError::Scrape(e.to_string()))?,
            resource_item: selector("student-resources-list")?,
            resource_title: selector(".fs-5.fst-normal")?,
            resource_link: selector(r#"a[target="_blank"]"#)?,
        })
    }

    fn parse_resource(&self, item: ElementRef<'_>, base: &Url) -> Result<ResourceFile> {
        let title = item
            .select(&self.resource_title)
            .next()
            .map(element_text)
            .ok_or_else(|| SyncError::Scrape("resource has no title".to_string()))?;
        let link = item
            .select(&self.resource_link)
            .next()
            .ok_or_else(|| SyncError::Scrape("resource has no download link".to_string()))?;
        let raw_href = link
            .value()
            .attr("href")
            .ok_or_else(|| SyncError::Scrape("download link has no href".to_string()))?;
        let href = base
            .join(raw_href)
            .map_err(|e| SyncError::Scrape(format!("invalid href {raw_href:?}: {e}")))?;

        // A blank title would otherwise produce a hidden dotfile.
        let title = if title.is_empty() {
            UNTITLED.to_string()
        } else {
            title
        };

        Ok(ResourceFile {
            href: href.to_string(),
            title,
            original_filename: element_text(link),
        })
    }
}

impl PageScraper for PortalScraper {
    fn parse_courses(&self, html: &str) -> Result<Vec<Course>> {
        let document = Html::parse_document(html);
        let mut courses = Vec::new();

        for card in document.select(&self.course_card) {
            let Some(href) = card
                .select(&self.course_link)
                .next()
                .and_then(|link| link.value().attr("href"))
            else {
                continue;
            };
            let Some(id) = self.course_id.captures(href).map(|caps| caps[1].to_string()) else {
                debug!("Skipping course card with unrecognized link: {}", href);
                continue;
            };

            let name = card
                .select(&self.course_label)
                .next()
                .map(element_text)
                .filter(|label| !label.is_empty())
                .map(|label| sanitize_course_name(&label))
                .unwrap_or_else(|| UNKNOWN_COURSE.to_string());

            courses.push(Course { id, name });
        }

        debug!("Found {} course(s) in catalog", courses.len());
        Ok(courses)
    }

    fn find_resources(&self, html: &str, page_url: &str) -> Result<Option<Vec<ResourceFile>>> {
        let base = Url::parse(page_url)
            .map_err(|e| SyncError::Scrape(format!("invalid page url {page_url:?}: {e}")))?;
        let document = Html::parse_document(html);

        let mut items = document.select(&self.resource_item).peekable();
        if items.peek().is_none() {
            return Ok(None);
        }

        let mut files = Vec::new();
        for item in items {
            match self.parse_resource(item, &base) {
                Ok(file) => files.push(file),
                Err(e) => warn!("Skipping resource element on {}: {}", page_url, e),
            }
        }
        Ok(Some(files))
    }
}

//! HTML parser for contribution calendars
//!
//! The contribution calendar is only served as HTML. Every day of the calendar
//! is an element carrying a `data-date` attribute; its contribution count is
//! either a `data-count` attribute (older markup) or the text of the tooltip
//! pointing at the element's id (current markup).

use crate::crawler::user::ContributionDay;
use chrono::NaiveDate;
use scraper::{Html, Selector};
use std::collections::HashMap;

/// Parses a contribution calendar page into days, sorted by date
///
/// # Arguments
///
/// * `html` - The calendar HTML
///
/// # Returns
///
/// * `Ok(Vec<ContributionDay>)` - One entry per calendar day (possibly empty)
/// * `Err(String)` - The page is not a contribution calendar
///
/// # Example
///
/// ```
/// use github_city::crawler::parse_contributions;
///
/// let html = r#"<svg><rect class="day" data-date="2015-01-01" data-count="3"/></svg>"#;
/// let days = parse_contributions(html).unwrap();
/// assert_eq!(days[0].count, 3);
/// ```
pub fn parse_contributions(html: &str) -> Result<Vec<ContributionDay>, String> {
    let document = Html::parse_document(html);

    let day_selector =
        Selector::parse("[data-date]").map_err(|e| format!("invalid selector: {}", e))?;
    let tooltips = extract_tooltips(&document);

    let mut days = Vec::new();
    for element in document.select(&day_selector) {
        let attrs = element.value();

        let date = match attrs
            .attr("data-date")
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        {
            Some(date) => date,
            None => continue,
        };

        let count = attrs
            .attr("data-count")
            .and_then(|c| c.trim().parse::<u32>().ok())
            .or_else(|| {
                attrs
                    .id()
                    .and_then(|id| tooltips.get(id))
                    .and_then(|text| parse_tooltip_count(text))
            })
            .or_else(|| {
                // Only the intensity level is known; any non-zero level means activity
                attrs
                    .attr("data-level")
                    .and_then(|l| l.parse::<u32>().ok())
                    .map(|level| level.min(1))
            })
            .unwrap_or(0);

        days.push(ContributionDay { date, count });
    }

    days.sort_by_key(|d| d.date);
    days.dedup_by_key(|d| d.date);
    Ok(days)
}

/// Maps tooltip targets (`for` attribute) to tooltip text
fn extract_tooltips(document: &Html) -> HashMap<String, String> {
    let mut tooltips = HashMap::new();

    if let Ok(selector) = Selector::parse("tool-tip[for]") {
        for element in document.select(&selector) {
            if let Some(target) = element.value().attr("for") {
                let text = element.text().collect::<String>();
                tooltips.insert(target.to_string(), text.trim().to_string());
            }
        }
    }

    tooltips
}

/// Reads the count from tooltip text such as "1,024 contributions on March 3rd."
fn parse_tooltip_count(text: &str) -> Option<u32> {
    let first = text.split_whitespace().next()?;
    if first.eq_ignore_ascii_case("no") {
        return Some(0);
    }
    first.replace(',', "").parse().ok()
}

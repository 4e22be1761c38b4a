//! The summary view that accompanies every export.

use crate::row::{ContactMethod, ExportRow, Priority};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeMap;

const TOP_SPECIALTIES: usize = 5;

/// Counts over a set of export rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    /// Rows exported
    pub total: usize,
    /// Rows with an email
    pub with_email: usize,
    /// Rows with a phone
    pub with_phone: usize,
    /// Rows with a website
    pub with_website: usize,
    /// Rows sourced from Instagram
    pub from_instagram: usize,
    /// Rows per priority tier
    pub by_priority: BTreeMap<Priority, usize>,
    /// Rows per best contact method
    pub by_method: BTreeMap<ContactMethod, usize>,
    /// Most common specialties, most frequent first
    pub top_specialties: Vec<(String, usize)>,
}

impl ExportSummary {
    /// Tally `rows`.
    #[must_use]
    pub fn from_rows(rows: &[ExportRow]) -> Self {
        let mut summary = Self {
            total: rows.len(),
            ..Self::default()
        };
        let mut specialties: BTreeMap<&str, usize> = BTreeMap::new();

        for row in rows {
            summary.with_email += usize::from(!row.email.is_empty());
            summary.with_phone += usize::from(!row.phone.is_empty());
            summary.with_website += usize::from(!row.website.is_empty());
            summary.from_instagram += usize::from(row.source == "instagram");
            *summary.by_priority.entry(row.priority).or_default() += 1;
            *summary.by_method.entry(row.best_contact_method).or_default() += 1;

            for specialty in row.specialties.split(", ").map(str::trim) {
                if !specialty.is_empty() {
                    *specialties.entry(specialty).or_default() += 1;
                }
            }
        }

        let mut ranked: Vec<_> = specialties
            .into_iter()
            .map(|(name, count)| (name.to_string(), count))
            .collect();
        // Stable sort keeps ties alphabetical
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(TOP_SPECIALTIES);
        summary.top_specialties = ranked;
        summary
    }

    /// Rows in `priority`.
    #[must_use]
    pub fn priority_count(&self, priority: Priority) -> usize {
        self.by_priority.get(&priority).copied().unwrap_or(0)
    }

    /// Rows whose best method is `method`.
    #[must_use]
    pub fn method_count(&self, method: ContactMethod) -> usize {
        self.by_method.get(&method).copied().unwrap_or(0)
    }

    /// `Metric`/`Value` pairs, as written to the summary sheet or file.
    #[must_use]
    pub fn rows(&self, generated: NaiveDateTime) -> Vec<(String, String)> {
        let metric = |name: &str, value: usize| (name.to_string(), value.to_string());
        let spacer = || (String::new(), String::new());

        let mut rows = vec![
            metric("Total Healers", self.total),
            metric("With Email", self.with_email),
            metric("With Phone", self.with_phone),
            metric("High Priority", self.priority_count(Priority::High)),
            metric("Medium Priority", self.priority_count(Priority::Medium)),
            metric("Low Priority", self.priority_count(Priority::Low)),
            metric("Instagram Discovered", self.from_instagram),
            metric("Website Available", self.with_website),
            spacer(),
            ("Best Contact Method:".to_string(), String::new()),
        ];
        rows.extend(
            ContactMethod::ALL
                .iter()
                .map(|m| (format!("  {m}"), self.method_count(*m).to_string())),
        );
        rows.push(spacer());
        rows.push(("Top Specialties:".to_string(), String::new()));
        rows.extend(
            self.top_specialties
                .iter()
                .map(|(name, count)| (format!("  {name}"), count.to_string())),
        );
        rows.push(spacer());
        rows.push((
            "Generated".to_string(),
            generated.format("%m/%d/%Y %H:%M").to_string(),
        ));
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use healer_core::{Confidence, HealerCandidate};

    fn row(name: &str, email: bool, specialties: &[&str], source: &str) -> ExportRow {
        let mut h = HealerCandidate::new(name, source);
        if email {
            h.email = Some(format!("{}@example-healing.com", name.to_lowercase()));
        }
        h.specialties = specialties.iter().map(ToString::to_string).collect();
        h.contact_confidence = Confidence::new(0.8);
        ExportRow::from_healer(&h)
    }

    #[test]
    fn test_counts() {
        let rows = vec![
            row("Ana", true, &["Reiki", "Meditation"], "psychology_today"),
            row("Bea", true, &["Reiki"], "instagram"),
            row("Cy", false, &["Tarot"], "instagram"),
        ];
        let summary = ExportSummary::from_rows(&rows);

        assert_eq!(summary.total, 3);
        assert_eq!(summary.with_email, 2);
        assert_eq!(summary.from_instagram, 2);
        assert_eq!(summary.method_count(ContactMethod::Email), 2);
        assert_eq!(summary.method_count(ContactMethod::ResearchRequired), 1);
        assert_eq!(summary.top_specialties[0], ("Reiki".to_string(), 2));
        assert_eq!(summary.top_specialties.len(), 3);
        // email 3 + confidence 2 + Reiki 2
        assert_eq!(summary.priority_count(Priority::High), 2);
        assert_eq!(summary.priority_count(Priority::Low), 1);
    }

    #[test]
    fn test_rows_layout() {
        let rows = vec![row("Ana", true, &["Reiki"], "psychology_today")];
        let generated = chrono::NaiveDate::from_ymd_opt(2026, 3, 3)
            .and_then(|d| d.and_hms_opt(9, 5, 0))
            .expect("valid datetime");
        let table = ExportSummary::from_rows(&rows).rows(generated);

        assert_eq!(table[0], ("Total Healers".to_string(), "1".to_string()));
        assert!(table.contains(&("  Email".to_string(), "1".to_string())));
        assert!(table.contains(&("  Reiki".to_string(), "1".to_string())));
        assert_eq!(
            table.last(),
            Some(&("Generated".to_string(), "03/03/2026 09:05".to_string()))
        );
    }

    #[test]
    fn test_empty() {
        let summary = ExportSummary::from_rows(&[]);
        assert_eq!(summary.total, 0);
        assert!(summary.top_specialties.is_empty());
        assert_eq!(summary.priority_count(Priority::High), 0);
    }
}

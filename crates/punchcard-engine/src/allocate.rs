//! Percentage-based project time allocation
//!
//! Schedule rows give each project either a percentage (`"40%"`) or a
//! duration-shaped string. Allocation distributes the day's actual worked
//! minutes across projects so the per-project minutes sum exactly to the
//! total, with floor rounding absorbed by the last project that received
//! any time.

use punchcard_core::ProjectEntry;
use tracing::{debug, info, warn};

/// Distribute `total_minutes` across `entries` by percentage
///
/// Percentages are read left to right against a running cumulative total;
/// an entry that would push the cumulative past 100 is forced to zero and
/// does not consume budget, so a later, smaller entry may still fit. The
/// floor-rounding remainder goes to the last entry with nonzero minutes;
/// when every entry came out zero, the first entry receives the whole
/// total. The returned minutes always sum to exactly `total_minutes`
/// (given a nonempty entry list and `total_minutes > 0`).
pub fn allocate(entries: &[ProjectEntry], total_minutes: u32) -> Vec<u32> {
    let mut cumulative = 0.0_f64;
    let mut percentages = Vec::with_capacity(entries.len());

    for (i, entry) in entries.iter().enumerate() {
        let parsed = effective_percentage(&entry.raw_value);
        let Some(pct) = parsed else {
            if !entry.raw_value.trim().is_empty() {
                warn!("Project {}: cannot parse {:?}, treating as 0%", i + 1, entry.raw_value);
            }
            percentages.push(0.0);
            continue;
        };
        if cumulative + pct > 100.0 {
            info!("Project {}: cumulative would exceed 100%, forcing to 0%", i + 1);
            percentages.push(0.0);
        } else {
            cumulative += pct;
            debug!("Project {}: {}% (cumulative {}%)", i + 1, pct, cumulative);
            percentages.push(pct);
        }
    }

    let mut minutes: Vec<u32> = percentages
        .iter()
        .map(|&pct| {
            if pct > 0.0 {
                (total_minutes as f64 * pct / 100.0) as u32
            } else {
                0
            }
        })
        .collect();

    let allocated: u32 = minutes.iter().sum();
    let remainder = total_minutes.saturating_sub(allocated);
    if remainder > 0 {
        if let Some(last) = minutes.iter().rposition(|&m| m > 0) {
            minutes[last] += remainder;
            debug!("Remainder {} min added to project {}", remainder, last + 1);
        } else if let Some(first) = minutes.first_mut() {
            *first = total_minutes;
            info!("All projects at 0%, assigning full {} min to project 1", total_minutes);
        }
    }

    minutes
}

/// Parse a raw schedule value as a percentage
///
/// `"NN%"` and bare `"NN"` parse as the number. A duration-shaped `"H:MM"`
/// value in this percentage context reads the hour component alone as the
/// percentage (`"3:30"` is 3%). That asymmetry is long-standing observed
/// behavior of the schedules this feeds on; keep it.
fn effective_percentage(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let pct = if let Some((hours, _)) = raw.split_once(':') {
        hours.trim().parse::<f64>().ok()?
    } else {
        raw.trim_end_matches('%').trim().parse::<f64>().ok()?
    };
    if pct > 0.0 {
        Some(pct)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(raws: &[&str]) -> Vec<ProjectEntry> {
        raws.iter()
            .map(|r| ProjectEntry {
                raw_value: r.to_string(),
                comment: String::new(),
            })
            .collect()
    }

    #[test]
    fn allocation_sums_to_total() {
        for raws in [
            vec!["30%", "30%", "40%"],
            vec!["33%", "33%", "33%"],
            vec!["100%"],
            vec!["7%", "11%", "13%"],
        ] {
            let result = allocate(&entries(&raws), 453);
            assert_eq!(result.iter().sum::<u32>(), 453, "raws: {:?}", raws);
        }
    }

    #[test]
    fn overflow_entry_is_rejected_without_consuming_budget() {
        // 50% would push the cumulative to 110, so it contributes nothing
        // and the floor remainder lands back on the first entry.
        let result = allocate(&entries(&["60%", "50%"]), 480);
        assert_eq!(result[1], 0);
        assert_eq!(result.iter().sum::<u32>(), 480);

        // A later entry can still fit after an earlier rejection.
        let result = allocate(&entries(&["60%", "50%", "40%"]), 100);
        assert_eq!(result[1], 0);
        assert!(result[2] > 0);
        assert_eq!(result.iter().sum::<u32>(), 100);
    }

    #[test]
    fn remainder_goes_to_last_nonzero_entry() {
        // floor gives [25, 25]; the 50-minute remainder lands on the last
        // entry that got anything.
        let result = allocate(&entries(&["25%", "25%"]), 100);
        assert_eq!(result, vec![25, 75]);
    }

    #[test]
    fn all_zero_falls_back_to_first_entry() {
        let result = allocate(&entries(&["0%", "0%"]), 480);
        assert_eq!(result, vec![480, 0]);

        let result = allocate(&entries(&["", "garbage"]), 480);
        assert_eq!(result, vec![480, 0]);
    }

    #[test]
    fn duration_shaped_value_reads_hour_as_percentage() {
        // "3:30" means 3% here, not three and a half hours.
        let result = allocate(&entries(&["3:30", "97%"]), 1000);
        assert_eq!(result[0], 30);
        assert_eq!(result.iter().sum::<u32>(), 1000);
    }

    #[test]
    fn bare_numbers_parse_as_percentages() {
        let result = allocate(&entries(&["50", "50%"]), 200);
        assert_eq!(result, vec![100, 100]);
    }

    #[test]
    fn empty_entry_list_allocates_nothing() {
        assert!(allocate(&[], 480).is_empty());
    }

    #[test]
    fn zero_total_yields_zeros() {
        assert_eq!(allocate(&entries(&["50%", "50%"]), 0), vec![0, 0]);
    }
}

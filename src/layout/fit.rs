use super::TextMeasure;
use crate::config::LayoutConfig;

/// Box the text block has to fit into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub max_width: f64,
    pub max_height: f64,
}

/// Candidate sequence and line spacing for the font size search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitRules {
    pub step: f64,
    pub floor: f64,
    pub line_spacing: f64,
}

impl From<&LayoutConfig> for FitRules {
    fn from(config: &LayoutConfig) -> Self {
        Self {
            step: config.font_step,
            floor: config.min_font_size,
            line_spacing: config.line_spacing,
        }
    }
}

/// Largest size in `start, start - step, ...` at which `text` fits `bounds`.
///
/// The widest line must fit `max_width` and `lines * size + (lines - 1) *
/// line_spacing` must fit `max_height`. Returns `rules.floor` when no
/// candidate above the floor fits.
pub fn fit_font_size<M: TextMeasure + ?Sized>(
    measure: &M,
    text: &str,
    bounds: Bounds,
    start_size: f64,
    rules: FitRules,
) -> f64 {
    let lines: Vec<&str> = text.split('\n').collect();
    let line_count = lines.len() as f64;

    let mut candidate: u32 = 0;
    loop {
        // Derived from the counter so repeated subtraction cannot drift.
        let size = start_size - f64::from(candidate) * rules.step;
        if size <= rules.floor {
            return rules.floor;
        }

        let widest = lines
            .iter()
            .map(|line| measure.text_width(line, size))
            .fold(0.0_f64, f64::max);
        let height = line_count * size + (line_count - 1.0) * rules.line_spacing;

        if widest <= bounds.max_width && height <= bounds.max_height {
            return size;
        }
        candidate += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::testing::FixedAdvance;

    const RULES: FitRules = FitRules { step: 0.5, floor: 1.0, line_spacing: 0.5 };

    fn fits(text: &str, bounds: Bounds, size: f64) -> bool {
        let lines: Vec<&str> = text.split('\n').collect();
        let n = lines.len() as f64;
        let widest = lines
            .iter()
            .map(|l| FixedAdvance(0.5).text_width(l, size))
            .fold(0.0, f64::max);
        widest <= bounds.max_width && n * size + (n - 1.0) * RULES.line_spacing <= bounds.max_height
    }

    #[test]
    fn test_short_text_keeps_start_size() {
        let bounds = Bounds { max_width: 80.0, max_height: 80.0 };
        let size = fit_font_size(&FixedAdvance(0.5), "PartA\nPartB", bounds, 16.0, RULES);
        assert_eq!(size, 16.0);
    }

    #[test]
    fn test_wide_line_shrinks_until_it_fits() {
        let bounds = Bounds { max_width: 80.0, max_height: 80.0 };
        let text = "a very long part description\nshort";
        let size = fit_font_size(&FixedAdvance(0.5), text, bounds, 16.0, RULES);

        assert!(size < 16.0);
        assert!(fits(text, bounds, size));
        assert!(!fits(text, bounds, size + RULES.step));
        // 28 chars * 0.5 em must fit 80pt: 80 / 14 = 5.71, so 5.5 on the 0.5 grid.
        assert_eq!(size, 5.5);
    }

    #[test]
    fn test_too_many_lines_limits_by_height() {
        let bounds = Bounds { max_width: 1000.0, max_height: 40.0 };
        let text = "a\nb\nc\nd";
        let size = fit_font_size(&FixedAdvance(0.5), text, bounds, 16.0, RULES);
        // 4 * size + 3 * 0.5 <= 40 → size <= 9.625
        assert_eq!(size, 9.5);
    }

    #[test]
    fn test_nothing_fits_returns_floor() {
        let bounds = Bounds { max_width: 2.0, max_height: 80.0 };
        let size = fit_font_size(&FixedAdvance(0.5), &"x".repeat(500), bounds, 16.0, RULES);
        assert_eq!(size, 1.0);
    }

    #[test]
    fn test_start_at_or_below_floor_returns_floor() {
        let bounds = Bounds { max_width: 100.0, max_height: 100.0 };
        assert_eq!(fit_font_size(&FixedAdvance(0.5), "x", bounds, 1.0, RULES), 1.0);
        assert_eq!(fit_font_size(&FixedAdvance(0.5), "x", bounds, 0.5, RULES), 1.0);
    }

    #[test]
    fn test_widest_line_decides_not_longest() {
        struct WideW;
        impl TextMeasure for WideW {
            fn text_width(&self, text: &str, font_size: f64) -> f64 {
                text.chars().map(|c| if c == 'W' { 2.0 } else { 0.25 }).sum::<f64>() * font_size
            }
        }
        let bounds = Bounds { max_width: 60.0, max_height: 100.0 };
        // "WWW" is shorter but 6 em wide; "iiiiiiii" is 2 em wide.
        let size = fit_font_size(&WideW, "iiiiiiii\nWWW", bounds, 16.0, RULES);
        assert_eq!(size, 10.0);
    }

    #[test]
    fn test_search_is_monotonic_in_start_size() {
        let bounds = Bounds { max_width: 70.0, max_height: 50.0 };
        let text = "Hex socket M4 x 20\nZinc plated\nDIN 912";
        let mut previous = f64::INFINITY;
        for k in 0..40 {
            let start = 20.0 - f64::from(k) * 0.5;
            let size = fit_font_size(&FixedAdvance(0.5), text, bounds, start, RULES);
            assert!(size <= previous, "start {start} gave {size} after {previous}");
            assert!(size <= start.max(RULES.floor));
            previous = size;
        }
    }
}

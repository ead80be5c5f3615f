//! # Utility Functions Module
//!
//! This module provides utility functions shared by the pipeline stages:
//! argument vector building, the evenly spaced timestamp rule and
//! rendering of command lines for logs.

/// Converts a vector of string-like items to Vec<String>.
///
/// This utility function accepts any iterable of items that can be converted
/// to String, eliminating repetitive `.to_string()` calls when building
/// decoder invocations.
///
/// # Example
/// ```rust,ignore
/// let args = to_string_vec(["-frames:v", &frames.to_string(), "-f", "null", "-"]);
/// ```
pub fn to_string_vec<T, I>(items: I) -> Vec<String>
where
    T: ToString,
    I: IntoIterator<Item = T>,
{
    items.into_iter().map(|item| item.to_string()).collect()
}

/// Macro for even more convenient argument building.
///
/// # Example
/// ```rust,ignore
/// use videohash::args;
///
/// let size = 240;
/// let args = args!["-s", format!("{size}x{size}"), "-f", "image2pipe", "-"];
/// ```
#[macro_export]
macro_rules! args {
    [$($item:expr),* $(,)?] => {
        $crate::utils::to_string_vec([$($item.to_string()),*])
    };
}

/// `n` evenly spaced timestamps inside `(0, duration)`.
///
/// `t_i = duration * i / (n + 1)` for `i = 1..=n`, so neither the first
/// nor the last instant of the video is ever sampled.
pub fn evenly_spaced_timestamps(duration: f64, n: usize) -> Vec<f64> {
    let step = duration / (n + 1) as f64;
    (1..=n).map(|i| step * i as f64).collect()
}

/// Render an argument list the way a shell user would type it
pub fn render_command(args: &[String]) -> String {
    args.iter()
        .map(|arg| {
            if arg.contains(' ') {
                format!("\"{}\"", arg)
            } else {
                arg.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_string_vec_mixed_types() {
        let num = 42;
        let result = to_string_vec(["-frames:v", &num.to_string(), "-"]);
        assert_eq!(result, vec!["-frames:v".to_string(), "42".to_string(), "-".to_string()]);
    }

    #[test]
    fn test_to_string_vec_empty() {
        let result: Vec<String> = to_string_vec(Vec::<&str>::new());
        assert_eq!(result, Vec::<String>::new());
    }

    #[test]
    fn test_args_macro() {
        let size = 240;
        let result = args!["-s", format!("{}x{}", size, size), "-v", 1];
        assert_eq!(result, vec!["-s", "240x240", "-v", "1"]);
    }

    #[test]
    fn test_timestamps_exclude_boundaries() {
        let ts = evenly_spaced_timestamps(50.0, 4);
        assert_eq!(ts, vec![10.0, 20.0, 30.0, 40.0]);

        let ts = evenly_spaced_timestamps(52.079, 16);
        assert_eq!(ts.len(), 16);
        assert!(ts[0] > 0.0);
        assert!(*ts.last().unwrap() < 52.079);
        assert!(ts.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_timestamps_single_sample_is_midpoint() {
        assert_eq!(evenly_spaced_timestamps(10.0, 1), vec![5.0]);
        assert!(evenly_spaced_timestamps(10.0, 0).is_empty());
    }

    #[test]
    fn test_render_command_quotes_spaces() {
        let args = to_string_vec(["ffmpeg", "-i", "/my videos/a.mp4"]);
        assert_eq!(render_command(&args), "ffmpeg -i \"/my videos/a.mp4\"");
    }
}

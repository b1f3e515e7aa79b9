const KIB: u64 = 1024;
const MIB: u64 = KIB * 1024;
const GIB: u64 = MIB * 1024;
const TIB: u64 = GIB * 1024;

#[inline]
pub fn bytes_to_iec_string(bytes: u64) -> String {
    let (value, unit) = if bytes < KIB {
        (bytes as f64, "B")
    } else if bytes < MIB {
        (bytes as f64 / KIB as f64, "KiB")
    } else if bytes < GIB {
        (bytes as f64 / MIB as f64, "MiB")
    } else if bytes < TIB {
        (bytes as f64 / GIB as f64, "GiB")
    } else {
        (bytes as f64 / TIB as f64, "TiB")
    };

    if unit == "B" {
        format!("{value} {unit}")
    } else {
        format!("{value:.1} {unit}")
    }
}

/// `{{ used|bytes }}` in segment templates.
pub fn bytes_filter(bytes: u64) -> String {
    bytes_to_iec_string(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iec_units() {
        assert_eq!(bytes_to_iec_string(0), "0 B");
        assert_eq!(bytes_to_iec_string(1023), "1023 B");
        assert_eq!(bytes_to_iec_string(1024), "1.0 KiB");
        assert_eq!(bytes_to_iec_string(1536), "1.5 KiB");
        assert_eq!(bytes_to_iec_string(8 * GIB), "8.0 GiB");
        assert_eq!(bytes_to_iec_string(3 * TIB / 2), "1.5 TiB");
    }

    #[test]
    fn test_bytes_filter_in_a_template() {
        use crate::functions::template::{environment, SegmentTemplate};

        #[derive(Default, serde::Serialize)]
        struct Usage {
            used: u64,
        }

        let mut env = environment();
        env.add_filter("bytes", bytes_filter);
        let template = SegmentTemplate::<Usage>::compile(env, "{{ used|bytes }}").unwrap();
        assert_eq!(template.render(&Usage { used: 2 * MIB }).unwrap(), "2.0 MiB");
    }
}

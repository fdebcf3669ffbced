use num_complex::Complex64;

use crate::value::Value;

/// The display strings for one result: the main answer plus any alternate
/// renderings (other bases, engineering notation, polar form) the host may
/// list below it.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayForm {
    pub primary: String,
    pub alternates: Vec<String>,
}

/// Groups a digit string with spaces every `size` digits from the right.
fn group_from_right(digits: &str, size: usize) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / size);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % size == 0 {
            out.push(' ');
        }
        out.push(c);
    }
    out
}

fn group_int(n: i64) -> String {
    let grouped = group_from_right(&n.unsigned_abs().to_string(), 3);
    if n < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

fn hex_form(n: i64) -> String {
    let grouped = group_from_right(&format!("{:X}", n.unsigned_abs()), 4);
    if n < 0 {
        format!("-0x{}", grouped)
    } else {
        format!("0x{}", grouped)
    }
}

fn bin_form(n: i64) -> String {
    let grouped = group_from_right(&format!("{:b}", n.unsigned_abs()), 4);
    if n < 0 {
        format!("-0b{}", grouped)
    } else {
        format!("0b{}", grouped)
    }
}

/// Rounds to the 5 decimal places the host displays. Values too large for
/// that precision to mean anything pass through.
fn round5(x: f64) -> f64 {
    if !x.is_finite() || x.abs() >= 1e15 {
        return x;
    }
    (x * 1e5).round() / 1e5
}

fn group_float(x: f64) -> String {
    let r = round5(x);
    let s = r.abs().to_string();
    if s.contains('e') {
        // already in scientific notation, nothing to group
        return if r < 0.0 { format!("-{}", s) } else { s };
    }

    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (s.as_str(), None),
    };
    let mut out = String::new();
    if r < 0.0 {
        out.push('-');
    }
    out.push_str(&group_from_right(int_part, 3));
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

fn int_form(n: i64, eng: Option<String>) -> DisplayForm {
    let mut alternates = vec![hex_form(n)];
    if n.unsigned_abs() < 1u64 << 32 {
        alternates.push(bin_form(n));
    }
    alternates.extend(eng);
    DisplayForm {
        primary: group_int(n),
        alternates,
    }
}

fn complex_form(c: Complex64) -> DisplayForm {
    let re = round5(c.re);
    let im = round5(c.im);
    let primary = if im < 0.0 {
        format!("{}-{}i", re, -im)
    } else {
        format!("{}+{}i", re, im)
    };

    let (r, theta) = c.to_polar();
    let polar = format!(
        "{} ∠ {} rad ({}°)",
        round5(r),
        round5(theta),
        round5(theta.to_degrees())
    );
    DisplayForm {
        primary,
        alternates: vec![polar],
    }
}

/// Renders a value into its display strings.
pub fn format(value: &Value) -> DisplayForm {
    match value {
        Value::Int(n) => int_form(*n, None),
        Value::Float(x) => {
            // integral floats read as integers, in every base
            if value.is_integral() && x.abs() < i64::MAX as f64 {
                int_form(*x as i64, Some(to_eng(*x)))
            } else {
                DisplayForm {
                    primary: group_float(*x),
                    alternates: vec![to_eng(*x)],
                }
            }
        }
        Value::Complex(c) => complex_form(*c),
    }
}

/// Renders a float in engineering notation with an SI-style magnitude
/// prefix. Exposed on its own because the host uses it outside full
/// evaluations too.
///
/// The multi-letter `Meg`/`Giga` above the single letters below is how the
/// plugin has always displayed these.
pub fn to_eng(value: f64) -> String {
    if value == 0.0 || !value.is_finite() {
        return value.to_string();
    }

    let e = (value.abs().log10() / 3.0).floor() as i32;
    let suffix = match e {
        -5 => "f",
        -4 => "p",
        -3 => "n",
        -2 => "u",
        -1 => "m",
        0 => "",
        1 => "k",
        2 => "Meg",
        3 => "Giga",
        _ => return format!("{:e}", value),
    };
    let mantissa = round5(value / 1000f64.powi(e));
    format!("{}{}", mantissa, suffix)
}

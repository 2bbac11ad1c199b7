//! Category rules for WinGo digits
//!
//! Pure, total functions mapping a winning digit 0-9 to its size and color.
//! Callers must validate range upstream; these are only defined for 0-9.

use crate::types::{Color, Forecast, Size};

/// n >= 5 is Big, else Small
pub fn size_of(n: u8) -> Size {
    if n >= 5 {
        Size::Big
    } else {
        Size::Small
    }
}

/// 9 is Violet, even digits are Red, odd digits are Green
pub fn color_of(n: u8) -> Color {
    match n {
        9 => Color::Violet,
        n if n % 2 == 0 => Color::Red,
        _ => Color::Green,
    }
}

/// Both categories for a digit
pub fn forecast_for(n: u8) -> Forecast {
    Forecast {
        color: color_of(n),
        size: size_of(n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_of() {
        for n in 0..5 {
            assert_eq!(size_of(n), Size::Small, "digit {}", n);
        }
        for n in 5..10 {
            assert_eq!(size_of(n), Size::Big, "digit {}", n);
        }
    }

    #[test]
    fn test_color_of() {
        assert_eq!(color_of(9), Color::Violet);
        for n in [0, 2, 4, 6, 8] {
            assert_eq!(color_of(n), Color::Red, "digit {}", n);
        }
        for n in [1, 3, 5, 7] {
            assert_eq!(color_of(n), Color::Green, "digit {}", n);
        }
    }

    #[test]
    fn test_forecast_for() {
        let f = forecast_for(7);
        assert_eq!(f.color, Color::Green);
        assert_eq!(f.size, Size::Big);

        let f = forecast_for(0);
        assert_eq!(f.color, Color::Red);
        assert_eq!(f.size, Size::Small);
    }
}

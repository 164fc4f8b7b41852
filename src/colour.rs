//! RGB and HSL colour conversions.
//!
//! Used to rotate the hue of an animated light while keeping its saturation
//! and lightness. RGB components are in `[0, 1]`, hue is in degrees `[0, 360)`,
//! saturation and lightness are in `[0, 1]`.

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Hsl {
    pub h: f32,
    pub s: f32,
    pub l: f32,
}

pub fn rgb_to_hsl(rgb: [f32; 3]) -> Hsl {
    let [r, g, b] = rgb;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    // Achromatic
    if max == min {
        return Hsl { h: 0.0, s: 0.0, l };
    }

    let delta = max - min;
    let s = if l < 0.5 {
        delta / (max + min)
    } else {
        delta / (2.0 - max - min)
    };
    let h = if max == r {
        60.0 * (g - b) / delta
    } else if max == g {
        60.0 * (b - r) / delta + 120.0
    } else {
        60.0 * (r - g) / delta + 240.0
    };

    Hsl {
        h: h.rem_euclid(360.0),
        s,
        l,
    }
}

pub fn hsl_to_rgb(hsl: Hsl) -> [f32; 3] {
    let h = hsl.h.rem_euclid(360.0);
    let c = (1.0 - (2.0 * hsl.l - 1.0).abs()) * hsl.s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = hsl.l - c / 2.0;

    let (r, g, b) = match h {
        h if h < 60.0 => (c, x, 0.0),
        h if h < 120.0 => (x, c, 0.0),
        h if h < 180.0 => (0.0, c, x),
        h if h < 240.0 => (0.0, x, c),
        h if h < 300.0 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    [r + m, g + m, b + m]
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn assert_rgb_eq(actual: [f32; 3], expected: [f32; 3]) {
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < EPSILON, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn primaries_have_expected_hues() {
        assert_eq!(rgb_to_hsl([1.0, 0.0, 0.0]).h, 0.0);
        assert!((rgb_to_hsl([0.0, 1.0, 0.0]).h - 120.0).abs() < EPSILON);
        assert!((rgb_to_hsl([0.0, 0.0, 1.0]).h - 240.0).abs() < EPSILON);
        let magenta = rgb_to_hsl([1.0, 0.0, 1.0]);
        assert!((magenta.h - 300.0).abs() < EPSILON);
        assert!((magenta.s - 1.0).abs() < EPSILON);
        assert!((magenta.l - 0.5).abs() < EPSILON);
    }

    #[test]
    fn achromatic_colours_have_no_saturation() {
        let grey = rgb_to_hsl([0.4, 0.4, 0.4]);
        assert_eq!(grey, Hsl { h: 0.0, s: 0.0, l: 0.4 });
        assert_rgb_eq(hsl_to_rgb(grey), [0.4, 0.4, 0.4]);
    }

    #[test]
    fn round_trips_representative_colours() {
        let colours = [
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 0.41, 0.7],
            [0.8, 0.8, 1.0],
            [0.2, 0.2, 0.3],
            [0.55, 0.5, 0.45],
            [0.0, 0.0, 0.0],
            [1.0, 1.0, 1.0],
            [0.5, 0.5, 0.5],
        ];
        for rgb in colours {
            assert_rgb_eq(hsl_to_rgb(rgb_to_hsl(rgb)), rgb);
        }
    }

    #[test]
    fn hue_wraps_around() {
        let red = Hsl { h: 0.0, s: 1.0, l: 0.5 };
        let wrapped = Hsl { h: 720.0, ..red };
        let negative = Hsl { h: -360.0, ..red };
        assert_rgb_eq(hsl_to_rgb(wrapped), hsl_to_rgb(red));
        assert_rgb_eq(hsl_to_rgb(negative), [1.0, 0.0, 0.0]);
    }
}

//! Styles.
//!
//! A [`Style`] holds the style rules as given by the user, either for a
//! whole layer or for an individual feature. Before shapes are created, the
//! rules are turned into a [`ShapeStyle`] understood by the renderer through
//! a [`StyleTransform`].

use std::fmt;
use std::convert::TryFrom;
use std::num::ParseIntError;
use serde::{Deserialize, Serialize};


//------------ Color ---------------------------------------------------------

/// A color.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    red: f64,
    green: f64,
    blue: f64,
    alpha: f64
}

impl Color {
    pub const fn rgb(red: f64, green: f64, blue: f64) -> Self {
        Color { red, green, blue, alpha: 1. }
    }

    pub const fn rgba(red: f64, green: f64, blue: f64, alpha: f64) -> Self {
        Color { red, green, blue, alpha }
    }

    pub fn hex(mut hex: &str) -> Result<Self, InvalidHexColor> {
        if let Some(stripped) = hex.strip_prefix('#') {
            hex = stripped;
        }
        if !hex.is_ascii() {
            return Err(InvalidHexColor)
        }
        let (r, g, b, a) = if hex.len() == 6 {
            (
                u8::from_str_radix(&hex[0..2], 16)?,
                u8::from_str_radix(&hex[2..4], 16)?,
                u8::from_str_radix(&hex[4..6], 16)?,
                0xFF,
            )
        }
        else if hex.len() == 8 {
            (
                u8::from_str_radix(&hex[0..2], 16)?,
                u8::from_str_radix(&hex[2..4], 16)?,
                u8::from_str_radix(&hex[4..6], 16)?,
                u8::from_str_radix(&hex[6..8], 16)?,
            )
        }
        else {
            return Err(InvalidHexColor)
        };
        Ok(Color::rgba(
            r as f64 / 255.,
            g as f64 / 255.,
            b as f64 / 255.,
            a as f64 / 255.,
        ))
    }

    pub fn alpha(self) -> f64 {
        self.alpha
    }

    pub fn with_alpha(self, alpha: f64) -> Self {
        Color { red: self.red, green: self.green, blue: self.blue, alpha }
    }

    /// Returns the color with its alpha multiplied by `opacity`.
    pub fn with_opacity(self, opacity: f64) -> Self {
        self.with_alpha(self.alpha * opacity.clamp(0., 1.))
    }
}

impl Color {
    pub const WHITE: Color = Color::rgb(1., 1., 1.);
    pub const BLACK: Color = Color::rgb(0., 0., 0.);
    pub const TRANSPARENT: Color = Color::rgba(0., 0., 0., 0.);
}

impl<'a> TryFrom<&'a str> for Color {
    type Error = InvalidHexColor;

    fn try_from(src: &'a str) -> Result<Self, Self::Error> {
        Self::hex(src)
    }
}

impl TryFrom<String> for Color {
    type Error = InvalidHexColor;

    fn try_from(src: String) -> Result<Self, Self::Error> {
        Self::hex(&src)
    }
}

impl From<Color> for String {
    fn from(src: Color) -> Self {
        src.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fn component(x: f64) -> u8 {
            (x.clamp(0., 1.) * 255.).round() as u8
        }

        write!(f, "#{:02x}{:02x}{:02x}",
            component(self.red), component(self.green), component(self.blue)
        )?;
        if self.alpha < 1. {
            write!(f, "{:02x}", component(self.alpha))?;
        }
        Ok(())
    }
}


//------------ Style ---------------------------------------------------------

/// The style rules for a feature.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Style {
    /// Whether areas are filled.
    pub fill: bool,
    pub fill_color: Color,
    pub fill_opacity: f64,

    /// Whether outlines and lines are stroked.
    pub stroke: bool,
    pub stroke_color: Color,
    pub stroke_opacity: f64,

    /// The stroke width in pixels.
    pub stroke_width: f64,

    /// The radius of point markers in pixels.
    pub point_radius: f64,
}

impl Default for Style {
    fn default() -> Self {
        // #ee9900
        let orange = Color::rgb(238. / 255., 153. / 255., 0.);
        Style {
            fill: true,
            fill_color: orange,
            fill_opacity: 0.4,
            stroke: true,
            stroke_color: orange,
            stroke_opacity: 1.,
            stroke_width: 1.,
            point_radius: 6.,
        }
    }
}


//------------ ShapeStyle ----------------------------------------------------

/// The style of a shape as understood by the renderer.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ShapeStyle {
    /// The fill color if the shape should be filled.
    pub fill: Option<Color>,

    /// The stroke if the shape should be stroked.
    pub stroke: Option<Stroke>,

    /// The radius of point markers in pixels.
    pub radius: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Stroke {
    pub color: Color,
    pub width: f64,
}


//------------ StyleTransform ------------------------------------------------

/// Turns style rules into a renderer style.
pub trait StyleTransform {
    fn transform_style(&self, style: &Style) -> ShapeStyle;
}

impl<F: Fn(&Style) -> ShapeStyle> StyleTransform for F {
    fn transform_style(&self, style: &Style) -> ShapeStyle {
        (*self)(style)
    }
}


//------------ DefaultTransform ----------------------------------------------

/// The standard style transform.
///
/// Opacities are folded into the colors. Strokes with a non-positive width
/// are dropped.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultTransform;

impl StyleTransform for DefaultTransform {
    fn transform_style(&self, style: &Style) -> ShapeStyle {
        ShapeStyle {
            fill: style.fill.then(|| {
                style.fill_color.with_opacity(style.fill_opacity)
            }),
            stroke: (style.stroke && style.stroke_width > 0.).then(|| {
                Stroke {
                    color: style.stroke_color.with_opacity(
                        style.stroke_opacity
                    ),
                    width: style.stroke_width,
                }
            }),
            radius: style.point_radius.max(0.),
        }
    }
}


//------------ InvalidHexColor -----------------------------------------------

#[derive(Clone, Copy, Debug)]
pub struct InvalidHexColor;

impl From<ParseIntError> for InvalidHexColor {
    fn from(_: ParseIntError) -> Self {
        InvalidHexColor
    }
}

impl fmt::Display for InvalidHexColor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("invalid color")
    }
}


//============ Tests =========================================================

//! Closed enumerations with stable textual labels.

/// Declares a fieldless enum whose variants carry a kebab-case label.
///
/// Generates `ALL`, `label()`, [`Display`](std::fmt::Display) and
/// [`FromStr`](std::str::FromStr) (failing with
/// [`OptionsError::UnknownValue`](crate::style::OptionsError)).
macro_rules! labeled_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident => $label:literal
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant
            ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Stable label used in configuration files and on the command line.
            #[must_use]
            pub const fn label(self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.label())
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::style::OptionsError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                let value = value.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|variant| variant.label().eq_ignore_ascii_case(value))
                    .ok_or_else(|| {
                        $crate::style::OptionsError::unknown_value(
                            stringify!($name),
                            value,
                            Self::ALL.iter().map(|variant| variant.label()),
                        )
                    })
            }
        }
    };
}

pub(crate) use labeled_enum;

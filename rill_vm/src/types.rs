//! The compile-time type model (§4.1, §4.2): scalar/heap kinds, the
//! promotion lattice, conversion validity, and name mangling.
//!
//! Grounded on `original_source/src/utility/Type.hpp`/`Type.cpp`:
//! `AbaciValue::Type`'s bit layout, `mangled()`'s byte-exact algorithm,
//! `ValidConversions`, and `operator==`'s "ignore the Constant bit, compare
//! structurally for composites" rule.

use rill_runtime::abi;
use std::fmt;

/// One of the eight storage kinds a [`Type`] can name, independent of any
/// `const` qualification (which [`Type`] tracks separately).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    None,
    Boolean,
    Integer,
    Floating,
    Complex,
    String,
    Instance,
    List,
}

impl Kind {
    /// Raw ABI tag shared with `rill_runtime` (`toType`'s call convention).
    pub fn raw_tag(self) -> abi::RawKind {
        match self {
            Kind::None => abi::NONE,
            Kind::Boolean => abi::BOOLEAN,
            Kind::Integer => abi::INTEGER,
            Kind::Floating => abi::FLOATING,
            Kind::Complex => abi::COMPLEX,
            Kind::String => abi::STRING,
            Kind::Instance => abi::INSTANCE,
            Kind::List => abi::LIST,
        }
    }

    /// Position in the numeric promotion lattice `Boolean <= Integer <=
    /// Floating <= Complex` (§4.2); `None` higher variants have no rank.
    pub fn promotion_rank(self) -> Option<u8> {
        match self {
            Kind::Boolean => Some(0),
            Kind::Integer => Some(1),
            Kind::Floating => Some(2),
            Kind::Complex => Some(3),
            _ => None,
        }
    }

    pub fn is_numeric(self) -> bool {
        self.promotion_rank().is_some()
    }
}

/// A fully resolved type: one of the eight scalar/heap kinds, qualified
/// `const` or not, with `Instance`/`List` additionally carrying their class
/// name / element type.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Scalar { kind: Kind, is_const: bool },
    /// A class is a template (§4.1): the same `class_name` can be
    /// constructed with different argument types, so each `InstanceType`
    /// carries the field types observed at its particular construction site
    /// rather than looking them up from a single shared declaration.
    Instance { class_name: String, field_types: Vec<Type>, is_const: bool },
    List { element: Box<Type>, is_const: bool },
}

impl Type {
    pub fn scalar(kind: Kind) -> Self {
        Type::Scalar { kind, is_const: false }
    }

    pub fn instance(class_name: impl Into<String>, field_types: Vec<Type>) -> Self {
        Type::Instance { class_name: class_name.into(), field_types, is_const: false }
    }

    pub fn kind(&self) -> Kind {
        match self {
            Type::Scalar { kind, .. } => *kind,
            Type::Instance { .. } => Kind::Instance,
            Type::List { .. } => Kind::List,
        }
    }

    pub fn is_const(&self) -> bool {
        match self {
            Type::Scalar { is_const, .. } => *is_const,
            Type::Instance { is_const, .. } => *is_const,
            Type::List { is_const, .. } => *is_const,
        }
    }

    /// `addConstToType`: clone-then-flip, recursing for composites.
    pub fn add_const(&self) -> Self {
        match self {
            Type::Scalar { kind, .. } => Type::Scalar { kind: *kind, is_const: true },
            Type::Instance { class_name, field_types, .. } => Type::Instance {
                class_name: class_name.clone(),
                field_types: field_types.clone(),
                is_const: true,
            },
            Type::List { element, .. } => Type::List {
                element: element.clone(),
                is_const: true,
            },
        }
    }

    /// `removeConstFromType`.
    pub fn remove_const(&self) -> Self {
        match self {
            Type::Scalar { kind, .. } => Type::Scalar { kind: *kind, is_const: false },
            Type::Instance { class_name, field_types, .. } => Type::Instance {
                class_name: class_name.clone(),
                field_types: field_types.clone(),
                is_const: false,
            },
            Type::List { element, .. } => Type::List {
                element: element.clone(),
                is_const: false,
            },
        }
    }

    /// Human-readable type name, used in error messages and by the `?`
    /// type-name operator. Matches `typeToString` byte-for-byte: a class
    /// name with its field types in parens (`c(int,str)`), a list's element
    /// type in brackets (`[int]`), scalars by their keyword spelling.
    pub fn display_name(&self) -> String {
        match self {
            Type::Scalar { kind, .. } => match kind {
                Kind::None => "nil".to_string(),
                Kind::Boolean => "bool".to_string(),
                Kind::Integer => "int".to_string(),
                Kind::Floating => "float".to_string(),
                Kind::Complex => "complex".to_string(),
                Kind::String => "str".to_string(),
                Kind::Instance | Kind::List => unreachable!("composite kinds carry their own variant"),
            },
            Type::Instance { class_name, field_types, .. } => {
                let fields: Vec<String> = field_types.iter().map(Type::display_name).collect();
                format!("{class_name}({})", fields.join(","))
            }
            Type::List { element, .. } => format!("[{}]", element.display_name()),
        }
    }

    /// Structural equality ignoring the `Constant` bit (`operator==`).
    pub fn equals_ignoring_const(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Scalar { kind: a, .. }, Type::Scalar { kind: b, .. }) => a == b,
            (
                Type::Instance { class_name: a, field_types: fa, .. },
                Type::Instance { class_name: b, field_types: fb, .. },
            ) => {
                a == b
                    && fa.len() == fb.len()
                    && fa.iter().zip(fb).all(|(x, y)| x.equals_ignoring_const(y))
            }
            (Type::List { element: a, .. }, Type::List { element: b, .. }) => a.equals_ignoring_const(b),
            _ => false,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Appends one raw byte as `.{hex}` the way `mangled()` escapes non-ASCII
/// bytes and `'`.
fn push_escaped_byte(out: &mut String, byte: u8) {
    out.push('.');
    out.push_str(&format!("{:x}", byte));
}

fn push_mangled_identifier(out: &mut String, text: &str) {
    for byte in text.bytes() {
        if byte >= 0x80 || byte == b'\'' {
            push_escaped_byte(out, byte);
        } else if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'.' {
            out.push(byte as char);
        } else {
            // original_source treats this as UnexpectedError0(BadChar); since
            // the lexer only ever admits identifier characters here, this
            // path is unreachable for well-formed input.
            out.push(byte as char);
        }
    }
}

/// Builds the mangled instantiation name for `name` called with
/// `parameter_types`, byte-exact with `original_source::mangled()`: each
/// parameter contributes `.` followed by its raw kind number (scalars) or
/// its mangled class name (instances).
pub fn mangle(name: &str, parameter_types: &[Type]) -> String {
    let mut out = String::new();
    push_mangled_identifier(&mut out, name);
    for ty in parameter_types {
        out.push('.');
        match ty {
            Type::Scalar { kind, .. } => {
                out.push_str(&(abi::raw(kind.raw_tag())).to_string());
            }
            Type::Instance { class_name, .. } => {
                push_mangled_identifier(&mut out, class_name);
            }
            Type::List { .. } => {
                // Lists are never themselves mangled as a parameter type in
                // the original design (only scalar/instance parameters
                // participate in overload resolution); encode the element
                // kind so two list-typed instantiations still disambiguate.
                out.push('7');
            }
        }
    }
    out
}

/// One entry of `ValidConversions` (§4.2): the set of `toType` targets a
/// given source kind may convert into.
pub fn valid_conversion_targets(from: Kind) -> &'static [Kind] {
    match from {
        Kind::Integer => &[Kind::Boolean, Kind::Integer, Kind::Floating, Kind::String],
        Kind::Floating => &[Kind::Boolean, Kind::Integer, Kind::Floating, Kind::String],
        Kind::Complex => &[Kind::Integer, Kind::Floating, Kind::Complex, Kind::String],
        Kind::String => &[Kind::Boolean, Kind::Integer, Kind::Floating, Kind::Complex, Kind::String],
        Kind::Boolean => &[Kind::Boolean, Kind::Integer, Kind::Floating, Kind::String],
        _ => &[],
    }
}

pub fn is_valid_conversion(from: Kind, to: Kind) -> bool {
    valid_conversion_targets(from).contains(&to)
}

/// `real`/`imag` are conversion-target-only pseudo-kinds that only accept a
/// `Complex` source (`ValidConversions[Real] == {Complex}` in the original,
/// read the other way around since those targets only ever apply to
/// `Complex` operands).
pub fn is_valid_real_imag_source(from: Kind) -> bool {
    from == Kind::Complex
}

/// One of the seven names `T(e)`-style conversion syntax accepts. `Real`/
/// `Imag` are the inference-only pseudo-kinds of §3: valid conversion
/// targets, erased to [`Kind::Floating`] before anything is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvTarget {
    Bool,
    Int,
    Float,
    Complex,
    Str,
    Real,
    Imag,
}

impl ConvTarget {
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "bool" => ConvTarget::Bool,
            "int" => ConvTarget::Int,
            "float" => ConvTarget::Float,
            "complex" => ConvTarget::Complex,
            "str" => ConvTarget::Str,
            "real" => ConvTarget::Real,
            "imag" => ConvTarget::Imag,
            _ => return None,
        })
    }

    /// The static [`Type`] a successful conversion produces.
    pub fn result_type(self) -> Type {
        Type::scalar(match self {
            ConvTarget::Bool => Kind::Boolean,
            ConvTarget::Int => Kind::Integer,
            ConvTarget::Float | ConvTarget::Real | ConvTarget::Imag => Kind::Floating,
            ConvTarget::Complex => Kind::Complex,
            ConvTarget::Str => Kind::String,
        })
    }

    /// The raw kind tag `toType`/the typed runtime entry points dispatch on,
    /// using [`abi::REAL`]/[`abi::IMAG`] for the two pseudo-kinds.
    pub fn raw_tag(self) -> abi::RawKind {
        match self {
            ConvTarget::Bool => abi::BOOLEAN,
            ConvTarget::Int => abi::INTEGER,
            ConvTarget::Float => abi::FLOATING,
            ConvTarget::Complex => abi::COMPLEX,
            ConvTarget::Str => abi::STRING,
            ConvTarget::Real => abi::REAL,
            ConvTarget::Imag => abi::IMAG,
        }
    }

    /// Whether a value of `from` may convert to this target (§4.2's
    /// `validSources` table).
    pub fn accepts(self, from: Kind) -> bool {
        match self {
            ConvTarget::Real | ConvTarget::Imag => from == Kind::Complex,
            _ => is_valid_conversion(from, self.static_kind_for_source_check()),
        }
    }

    fn static_kind_for_source_check(self) -> Kind {
        match self {
            ConvTarget::Bool => Kind::Boolean,
            ConvTarget::Int => Kind::Integer,
            ConvTarget::Float => Kind::Floating,
            ConvTarget::Complex => Kind::Complex,
            ConvTarget::Str => Kind::String,
            ConvTarget::Real | ConvTarget::Imag => Kind::Floating,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mangle_matches_parameter_count_and_kind() {
        let name = mangle("add", &[Type::scalar(Kind::Integer), Type::scalar(Kind::Floating)]);
        assert_eq!(name, "add.2.3");
    }

    #[test]
    fn mangle_escapes_high_bit_and_quote_bytes() {
        let name = mangle("fn'", &[]);
        assert_eq!(name, "fn.27");
    }

    #[test]
    fn equality_ignores_const_bit() {
        let a = Type::scalar(Kind::Integer);
        let b = a.add_const();
        assert!(a.equals_ignoring_const(&b));
        assert_ne!(a.is_const(), b.is_const());
    }

    #[test]
    fn promotion_rank_orders_numeric_kinds() {
        assert!(Kind::Boolean.promotion_rank() < Kind::Integer.promotion_rank());
        assert!(Kind::Integer.promotion_rank() < Kind::Floating.promotion_rank());
        assert!(Kind::Floating.promotion_rank() < Kind::Complex.promotion_rank());
    }

    #[test]
    fn display_name_brackets_lists_and_parenthesizes_instance_fields() {
        let list = Type::List {
            element: Box::new(Type::scalar(Kind::Integer)),
            is_const: false,
        };
        assert_eq!(list.display_name(), "[int]");

        let instance = Type::instance("c", vec![Type::scalar(Kind::Integer), Type::scalar(Kind::String)]);
        assert_eq!(instance.display_name(), "c(int,str)");
    }
}

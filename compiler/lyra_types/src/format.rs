//! Human-readable rendering of pool types for diagnostics.

use std::fmt;

use lyra_ir::StringInterner;

use crate::{Idx, NominalKind, Pool, Tag};

/// Nesting depth at which rendering gives up; flow cycles and deeply
/// nested types degrade to `...` instead of overflowing.
const MAX_DEPTH: usize = 32;

/// Lazily renders a type against its pool and interner.
pub struct TypeDisplay<'a> {
    pool: &'a Pool,
    interner: &'a StringInterner,
    idx: Idx,
}

impl Pool {
    /// Render `idx` for a diagnostic message.
    pub fn display<'a>(&'a self, interner: &'a StringInterner, idx: Idx) -> TypeDisplay<'a> {
        TypeDisplay {
            pool: self,
            interner,
            idx,
        }
    }
}

impl fmt::Display for TypeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, self.idx, 0)
    }
}

impl TypeDisplay<'_> {
    #[allow(clippy::too_many_lines)]
    fn render(&self, f: &mut fmt::Formatter<'_>, idx: Idx, depth: usize) -> fmt::Result {
        if idx.is_none() {
            return f.write_str("<none>");
        }
        if depth > MAX_DEPTH {
            return f.write_str("...");
        }
        if let Some(name) = idx.name() {
            return f.write_str(name);
        }
        let pool = self.pool;
        match pool.tag(idx) {
            Tag::Array => {
                f.write_str("[]")?;
                self.render(f, pool.array_elem(idx), depth + 1)
            }
            Tag::Option => {
                f.write_str("?")?;
                self.render(f, pool.option_inner(idx), depth + 1)
            }
            Tag::Map => {
                f.write_str("map(")?;
                self.render(f, pool.map_key(idx), depth + 1)?;
                f.write_str(", ")?;
                self.render(f, pool.map_value(idx), depth + 1)?;
                f.write_str(")")
            }
            Tag::Pointer => self.render_cell(f, "^", idx, depth),
            Tag::Reference => self.render_cell(f, "ref ", idx, depth),
            Tag::TypeOf => self.render_cell(f, "type ", idx, depth),
            Tag::Tuple => {
                f.write_str("(")?;
                for (i, elem) in pool.tuple_elems(idx).into_iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    self.render(f, elem, depth + 1)?;
                }
                f.write_str(")")
            }
            Tag::Function => {
                f.write_str("(")?;
                for (i, param) in pool.function_params(idx).into_iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    self.render(f, param, depth + 1)?;
                }
                write!(f, ")<{}> -> ", pool.function_effects(idx))?;
                self.render(f, pool.function_return(idx), depth + 1)
            }
            Tag::Nominal => {
                let info = pool.nominal(idx);
                match self.interner.resolve(info.name) {
                    Some(name) if !name.is_empty() => f.write_str(&name),
                    _ => match info.kind {
                        NominalKind::TypeVariable => {
                            write!(f, "t{}", pool.nominal_id(idx).0)
                        }
                        _ => write!(f, "<anonymous#{}>", pool.nominal_id(idx).0),
                    },
                }
            }
            Tag::Flow => {
                // Render what is known so far, not the placeholder itself.
                let resolved = pool.normal(idx);
                if pool.is_flow(resolved) {
                    f.write_str("...")
                } else {
                    self.render(f, resolved, depth + 1)
                }
            }
            // Primitive tags were handled by the fixed-index fast path.
            _ => f.write_str("<unknown>"),
        }
    }

    fn render_cell(
        &self,
        f: &mut fmt::Formatter<'_>,
        prefix: &str,
        idx: Idx,
        depth: usize,
    ) -> fmt::Result {
        let pool = self.pool;
        let (neg, pos) = (pool.negative_slot(idx), pool.positive_slot(idx));
        f.write_str(prefix)?;
        if neg == pos {
            self.render(f, pos, depth + 1)
        } else {
            f.write_str("(")?;
            self.render(f, neg, depth + 1)?;
            f.write_str(" .. ")?;
            self.render(f, pos, depth + 1)?;
            f.write_str(")")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EffectSet;
    use pretty_assertions::assert_eq;

    fn render(pool: &Pool, interner: &StringInterner, idx: Idx) -> String {
        pool.display(interner, idx).to_string()
    }

    #[test]
    fn primitives_render_by_name() {
        let pool = Pool::new();
        let interner = StringInterner::new();
        assert_eq!(render(&pool, &interner, Idx::INT), "int");
        assert_eq!(render(&pool, &interner, Idx::UNKNOWN), "<unknown>");
    }

    #[test]
    fn composites_render_structurally() {
        let mut pool = Pool::new();
        let interner = StringInterner::new();
        let arr = pool.array(Idx::INT);
        assert_eq!(render(&pool, &interner, arr), "[]int");

        let opt = pool.option(arr);
        assert_eq!(render(&pool, &interner, opt), "?[]int");

        let tup = pool.tuple(&[Idx::INT, Idx::STRING]);
        assert_eq!(render(&pool, &interner, tup), "(int, string)");
    }

    #[test]
    fn functions_render_with_effects() {
        let mut pool = Pool::new();
        let interner = StringInterner::new();
        let f = pool.function(&[Idx::INT], Idx::LOGIC, EffectSet::DECIDES);
        assert_eq!(render(&pool, &interner, f), "(int)<decides> -> logic");

        let pure = pool.function(&[], Idx::VOID, EffectSet::CONVERGES);
        assert_eq!(render(&pool, &interner, pure), "()<converges> -> void");
    }

    #[test]
    fn nominals_render_their_name() {
        let mut pool = Pool::new();
        let interner = StringInterner::new();
        let name = interner.intern("shape");
        let class = pool.new_nominal(crate::NominalInfo::new(NominalKind::Class, name));
        assert_eq!(render(&pool, &interner, class), "shape");
    }

    #[test]
    fn unresolved_flow_renders_ellipsis() {
        let mut pool = Pool::new();
        let interner = StringInterner::new();
        let (neg, _pos) = pool.new_flow_pair();
        // A negative placeholder still at top renders its child.
        assert_eq!(render(&pool, &interner, neg), "any");
    }
}

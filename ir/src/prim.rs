//! Symbolic integer expressions and the arithmetic analyzer.
//!
//! Shape dimensions are [`PrimExpr`] values: integer literals, named
//! symbolic variables, and arithmetic over them. The [`Analyzer`] decides
//! whether two dimensions are provably equal by normalizing both sides into
//! a canonical polynomial (integer-coefficient monomials over sorted
//! variable multisets). Floor division by a non-trivial divisor does not
//! distribute, so such subterms are kept as opaque atoms and compared by
//! their own canonical form.

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimExpr {
    Int(i64),
    Var(String),
    Add(Box<PrimExpr>, Box<PrimExpr>),
    Sub(Box<PrimExpr>, Box<PrimExpr>),
    Mul(Box<PrimExpr>, Box<PrimExpr>),
    FloorDiv(Box<PrimExpr>, Box<PrimExpr>),
}

impl PrimExpr {
    pub fn int(value: i64) -> Self {
        PrimExpr::Int(value)
    }

    pub fn var(name: impl Into<String>) -> Self {
        PrimExpr::Var(name.into())
    }

    pub fn floordiv(self, rhs: PrimExpr) -> Self {
        PrimExpr::FloorDiv(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Add for PrimExpr {
    type Output = PrimExpr;

    fn add(self, rhs: PrimExpr) -> PrimExpr {
        PrimExpr::Add(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Sub for PrimExpr {
    type Output = PrimExpr;

    fn sub(self, rhs: PrimExpr) -> PrimExpr {
        PrimExpr::Sub(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Mul for PrimExpr {
    type Output = PrimExpr;

    fn mul(self, rhs: PrimExpr) -> PrimExpr {
        PrimExpr::Mul(Box::new(self), Box::new(rhs))
    }
}

impl From<i64> for PrimExpr {
    fn from(value: i64) -> Self {
        PrimExpr::Int(value)
    }
}

/// One multiplicative factor of a monomial.
///
/// Sorted atom lists are the monomial keys of the canonical polynomial, so
/// `n * 3 * n` and `3 * (n * n)` normalize to the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum Atom {
    Var(String),
    /// Non-constant floor division, operands already canonicalized.
    FloorDiv(Box<PrimExpr>, Box<PrimExpr>),
}

type Monomial = Vec<Atom>;
type Poly = BTreeMap<Monomial, i64>;

/// Arithmetic simplifier for symbolic shape dimensions.
#[derive(Debug, Default)]
pub struct Analyzer;

impl Analyzer {
    pub fn new() -> Self {
        Self
    }

    /// Whether `a` and `b` denote the same integer for every assignment of
    /// their symbolic variables (up to polynomial reasoning).
    pub fn can_prove_equal(&self, a: &PrimExpr, b: &PrimExpr) -> bool {
        self.poly(a) == self.poly(b)
    }

    /// Canonical rendering of `expr`.
    pub fn simplify(&self, expr: &PrimExpr) -> PrimExpr {
        from_poly(&self.poly(expr))
    }

    fn poly(&self, expr: &PrimExpr) -> Poly {
        match expr {
            PrimExpr::Int(v) => {
                let mut poly = Poly::new();
                if *v != 0 {
                    poly.insert(Vec::new(), *v);
                }
                poly
            }
            PrimExpr::Var(name) => {
                let mut poly = Poly::new();
                poly.insert(vec![Atom::Var(name.clone())], 1);
                poly
            }
            PrimExpr::Add(a, b) => merge(self.poly(a), self.poly(b), 1),
            PrimExpr::Sub(a, b) => merge(self.poly(a), self.poly(b), -1),
            PrimExpr::Mul(a, b) => {
                let pa = self.poly(a);
                let pb = self.poly(b);
                let mut out = Poly::new();
                for (ma, ca) in &pa {
                    for (mb, cb) in &pb {
                        let mut key: Monomial = ma.iter().chain(mb.iter()).cloned().collect();
                        key.sort();
                        add_term(&mut out, key, ca * cb);
                    }
                }
                out
            }
            PrimExpr::FloorDiv(a, b) => {
                let pa = self.poly(a);
                let pb = self.poly(b);
                match (as_const(&pa), as_const(&pb)) {
                    (Some(lhs), Some(rhs)) if rhs != 0 => self.poly(&PrimExpr::Int(div_floor(lhs, rhs))),
                    (_, Some(1)) => pa,
                    _ => {
                        let atom =
                            Atom::FloorDiv(Box::new(from_poly(&pa)), Box::new(from_poly(&pb)));
                        let mut poly = Poly::new();
                        poly.insert(vec![atom], 1);
                        poly
                    }
                }
            }
        }
    }
}

fn add_term(poly: &mut Poly, key: Monomial, coeff: i64) {
    use std::collections::btree_map::Entry;
    match poly.entry(key) {
        Entry::Vacant(slot) => {
            if coeff != 0 {
                slot.insert(coeff);
            }
        }
        Entry::Occupied(mut slot) => {
            *slot.get_mut() += coeff;
            if *slot.get() == 0 {
                slot.remove();
            }
        }
    }
}

fn merge(mut lhs: Poly, rhs: Poly, sign: i64) -> Poly {
    for (key, coeff) in rhs {
        add_term(&mut lhs, key, sign * coeff);
    }
    lhs
}

fn as_const(poly: &Poly) -> Option<i64> {
    match poly.len() {
        0 => Some(0),
        1 => poly.get(&Monomial::new()).copied(),
        _ => None,
    }
}

fn div_floor(lhs: i64, rhs: i64) -> i64 {
    let quot = lhs / rhs;
    if lhs % rhs != 0 && (lhs < 0) != (rhs < 0) { quot - 1 } else { quot }
}

fn atom_expr(atom: &Atom) -> PrimExpr {
    match atom {
        Atom::Var(name) => PrimExpr::Var(name.clone()),
        Atom::FloorDiv(a, b) => PrimExpr::FloorDiv(a.clone(), b.clone()),
    }
}

fn from_poly(poly: &Poly) -> PrimExpr {
    let mut terms = Vec::with_capacity(poly.len());
    for (monomial, coeff) in poly {
        let factor = monomial.iter().map(atom_expr).reduce(|a, b| a * b);
        let term = match factor {
            None => PrimExpr::Int(*coeff),
            Some(f) if *coeff == 1 => f,
            Some(f) => PrimExpr::Int(*coeff) * f,
        };
        terms.push(term);
    }
    terms.into_iter().reduce(|a, b| a + b).unwrap_or(PrimExpr::Int(0))
}

// ============================================================
// Layer 4 — SMILES Atom Graph
// ============================================================
// Turns a SMILES string into a list of atoms and their
// neighbour lists. This is the input both the atom vocabulary
// and the graph feature generators work from.
//
// Tokenisation is regex-based at atom level:
//   "CC(=O)Oc1ccccc1"
//     → C C ( = O ) O c 1 c c c c c 1
//
// Graph construction walks the tokens once:
//   atom         → new node, bonded to the previous atom
//   ( / )        → push / pop the branch point
//   digit, %nn   → open or close a ring bond
//   .            → start a disconnected fragment
//   bond symbols → remembered for the next bond only
//
// This is not a chemistry toolkit: valence, implicit hydrogens,
// aromaticity perception and stereo are ignored. Unmatched ring
// labels and unrecognised characters are skipped.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

/// Atom-level SMILES token pattern (bracket atoms first, two-letter
/// halogens before their one-letter prefixes).
const SMILES_ATOM_PATTERN: &str = r"(\[[^\]]+]|Br?|Cl?|N|O|S|P|F|I|b|c|n|o|s|p|\(|\)|\.|=|#|-|\+|\\|/|:|~|@|\?|>|\*|\$|%[0-9]{2}|[0-9])";

fn pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // The pattern is a compile-time constant, so a failure here is a bug.
    RE.get_or_init(|| Regex::new(SMILES_ATOM_PATTERN).expect("valid SMILES regex"))
}

/// Split a SMILES string into atom-level tokens.
pub fn tokenize(smiles: &str) -> Vec<&str> {
    pattern().find_iter(smiles).map(|m| m.as_str()).collect()
}

// ─── Atom ─────────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atom {
    /// The token exactly as written, e.g. "c", "Cl", "[nH]".
    pub token:    String,
    /// Element symbol, lower-case when written aromatic.
    pub element:  String,
    pub aromatic: bool,
    pub charged:  bool,
}

impl Atom {
    fn from_token(token: &str) -> Self {
        let (element, charged) = if let Some(inner) = token
            .strip_prefix('[')
            .and_then(|t| t.strip_suffix(']'))
        {
            (bracket_element(inner), inner.contains('+') || inner.contains('-'))
        } else {
            (token.to_string(), false)
        };
        let aromatic = element.chars().next().is_some_and(|c| c.is_ascii_lowercase());
        Self { token: token.to_string(), element, aromatic, charged }
    }

    /// Element symbol with aromatic lower-casing removed.
    pub fn canonical_element(&self) -> String {
        let mut chars = self.element.chars();
        match chars.next() {
            Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
            None        => String::new(),
        }
    }
}

/// Element symbol inside a bracket atom: skip the isotope, take one
/// upper-case letter plus an optional lower-case one, or a single
/// lower-case (aromatic) letter.
fn bracket_element(inner: &str) -> String {
    let mut chars = inner.chars().skip_while(|c| c.is_ascii_digit()).peekable();
    let mut out = String::new();
    if let Some(first) = chars.next() {
        out.push(first);
        if first.is_ascii_uppercase() {
            if let Some(&next) = chars.peek() {
                if next.is_ascii_lowercase() {
                    out.push(next);
                }
            }
        }
    }
    out
}

fn is_atom_token(tok: &str) -> bool {
    tok.starts_with('[')
        || matches!(
            tok,
            "B" | "Br" | "C" | "Cl" | "N" | "O" | "S" | "P" | "F" | "I"
                | "b" | "c" | "n" | "o" | "s" | "p" | "*"
        )
}

fn is_ring_label(tok: &str) -> bool {
    tok.starts_with('%') || (tok.len() == 1 && tok.as_bytes()[0].is_ascii_digit())
}

// ─── AtomGraph ────────────────────────────────────────────────────────────────
/// Atoms of one molecule with undirected neighbour lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AtomGraph {
    atoms:          Vec<Atom>,
    neighbors:      Vec<Vec<usize>>,
    double_bonds:   usize,
    triple_bonds:   usize,
    ring_closures:  usize,
    fragments:      usize,
}

impl AtomGraph {
    /// Build the graph for `smiles`. Never fails; see the module notes.
    pub fn parse(smiles: &str) -> Self {
        let mut graph = Self::default();

        let mut prev: Option<usize>             = None;
        let mut branches: Vec<Option<usize>>    = Vec::new();
        let mut open_rings: HashMap<&str, (usize, Option<char>)> = HashMap::new();
        let mut pending_bond: Option<char>      = None;
        let mut dots = 0usize;

        for tok in tokenize(smiles) {
            match tok {
                "(" => branches.push(prev),
                ")" => {
                    if let Some(p) = branches.pop() {
                        prev = p;
                    }
                }
                "." | ">" => {
                    prev = None;
                    pending_bond = None;
                    dots += 1;
                }
                "-" | "=" | "#" | "$" | ":" | "/" | "\\" | "~" => {
                    pending_bond = tok.chars().next();
                }
                t if is_ring_label(t) => {
                    let Some(current) = prev else { continue };
                    if let Some((start, opening_bond)) = open_rings.remove(t) {
                        let order = pending_bond.take().or(opening_bond);
                        if graph.bond(start, current, order) {
                            graph.ring_closures += 1;
                        }
                    } else {
                        open_rings.insert(t, (current, pending_bond.take()));
                    }
                }
                t if is_atom_token(t) => {
                    let idx = graph.atoms.len();
                    graph.atoms.push(Atom::from_token(t));
                    graph.neighbors.push(Vec::new());
                    if let Some(p) = prev {
                        graph.bond(p, idx, pending_bond.take());
                    }
                    pending_bond = None;
                    prev = Some(idx);
                }
                // chirality, charge outside brackets, "?"
                _ => {}
            }
        }

        if !open_rings.is_empty() {
            tracing::debug!("{} unmatched ring label(s) in '{}'", open_rings.len(), smiles);
        }
        graph.fragments = if graph.atoms.is_empty() { 0 } else { dots + 1 };
        graph
    }

    /// Add an undirected bond; returns false for self-loops and duplicates.
    fn bond(&mut self, a: usize, b: usize, order: Option<char>) -> bool {
        if a == b || self.neighbors[a].contains(&b) {
            return false;
        }
        self.neighbors[a].push(b);
        self.neighbors[b].push(a);
        match order {
            Some('=') => self.double_bonds += 1,
            Some('#') => self.triple_bonds += 1,
            _ => {}
        }
        true
    }

    pub fn num_atoms(&self) -> usize {
        self.atoms.len()
    }

    pub fn num_bonds(&self) -> usize {
        self.neighbors.iter().map(Vec::len).sum::<usize>() / 2
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn neighbors(&self) -> &[Vec<usize>] {
        &self.neighbors
    }

    pub fn into_neighbors(self) -> Vec<Vec<usize>> {
        self.neighbors
    }

    pub fn degree(&self, atom: usize) -> usize {
        self.neighbors[atom].len()
    }

    /// Vocabulary key for an atom: its token and heavy-atom degree.
    pub fn atom_key(&self, atom: usize) -> String {
        format!("{}_{}", self.atoms[atom].token, self.degree(atom))
    }

    pub fn double_bonds(&self) -> usize {
        self.double_bonds
    }

    pub fn triple_bonds(&self) -> usize {
        self.triple_bonds
    }

    pub fn ring_closures(&self) -> usize {
        self.ring_closures
    }

    pub fn fragments(&self) -> usize {
        self.fragments
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_two_letter_halogens() {
        assert_eq!(tokenize("ClCBr"), vec!["Cl", "C", "Br"]);
        assert_eq!(tokenize("C[C@@H](N)O"), vec!["C", "[C@@H]", "(", "N", ")", "O"]);
    }

    #[test]
    fn test_chain_and_branch() {
        // C1-C2(-O3)-C4 with O as a branch on C2 (0-based: 0,1,2,3)
        let g = AtomGraph::parse("CC(O)C");
        assert_eq!(g.num_atoms(), 4);
        assert_eq!(g.neighbors()[0], vec![1]);
        assert_eq!(g.neighbors()[1], vec![0, 2, 3]);
        assert_eq!(g.neighbors()[2], vec![1]);
        assert_eq!(g.neighbors()[3], vec![1]);
        assert_eq!(g.num_bonds(), 3);
    }

    #[test]
    fn test_ring_closure() {
        let g = AtomGraph::parse("c1ccccc1");
        assert_eq!(g.num_atoms(), 6);
        assert_eq!(g.num_bonds(), 6);
        assert_eq!(g.ring_closures(), 1);
        assert!(g.neighbors().iter().all(|n| n.len() == 2));
        assert!(g.atoms().iter().all(|a| a.aromatic));
    }

    #[test]
    fn test_double_bond_and_fragments() {
        let g = AtomGraph::parse("C=O.[Na+]");
        assert_eq!(g.num_atoms(), 3);
        assert_eq!(g.double_bonds(), 1);
        assert_eq!(g.fragments(), 2);
        assert!(g.neighbors()[2].is_empty());
        assert!(g.atoms()[2].charged);
        assert_eq!(g.atoms()[2].element, "Na");
    }

    #[test]
    fn test_bracket_isotope_and_aromatic() {
        let g = AtomGraph::parse("[13CH4]");
        assert_eq!(g.atoms()[0].element, "C");
        let g = AtomGraph::parse("c1cc[nH]c1");
        assert_eq!(g.atoms()[3].element, "n");
        assert_eq!(g.atoms()[3].canonical_element(), "N");
    }

    #[test]
    fn test_atom_key_includes_degree() {
        let g = AtomGraph::parse("CCO");
        assert_eq!(g.atom_key(0), "C_1");
        assert_eq!(g.atom_key(1), "C_2");
        assert_eq!(g.atom_key(2), "O_1");
    }

    #[test]
    fn test_empty_and_unmatched_ring() {
        assert_eq!(AtomGraph::parse("").num_atoms(), 0);
        let g = AtomGraph::parse("C1CC");
        assert_eq!(g.num_atoms(), 3);
        assert_eq!(g.num_bonds(), 2);
    }
}

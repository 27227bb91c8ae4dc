//! Bounding-box query compiler.
//!
//! A search is described as a [`RectQuery`] and lowered into a small plan of
//! typed clauses. Rendering the plan emits the SQL text and the bind list
//! together, so parameter numbers cannot drift from their values.
//!
//! The binding contract is positional:
//! 1. `?1`–`?4` carry the box as `(maxLat, maxLon, minLat, minLon)`;
//! 2. tag pattern `i` binds its key at `?(5 + 2i)` and its value pattern at
//!    `?(6 + 2i)`;
//! 3. the final parameter is the row limit.
//!
//! The R\*-tree rectangle is stored as 32-bit floats rounded outwards, so it
//! only narrows the candidates. The exact `lat`/`lon` columns decide the
//! match. Boundary points are included.

use geo::Rect;

use crate::{CategoryFilter, TagPattern};

use super::SqlValue;

/// Limit bound when the caller asks for every match.
const UNLIMITED: i64 = -1;

/// Role of a bound parameter in a compiled query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindSlot {
    MaxLatitude,
    MaxLongitude,
    MinLatitude,
    MinLongitude,
    /// Key of the tag pattern at the given index.
    PatternKey(usize),
    /// Value pattern of the tag pattern at the given index.
    PatternValue(usize),
    Limit,
}

/// A parameter with its role.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub slot: BindSlot,
    pub value: SqlValue,
}

/// A search over the spatial index.
///
/// `limit` caps the number of rows returned; `0` means no limit.
#[derive(Debug, Clone, Copy)]
pub struct RectQuery<'a> {
    pub bounds: &'a Rect<f64>,
    pub filter: Option<&'a CategoryFilter>,
    pub patterns: &'a [TagPattern],
    pub limit: usize,
}

/// SQL text and its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    sql: String,
    bindings: Vec<Binding>,
}

impl CompiledQuery {
    /// Statement text with numbered placeholders.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Parameters in placeholder order.
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Roles of the parameters in placeholder order.
    pub fn binding_order(&self) -> Vec<BindSlot> {
        self.bindings.iter().map(|binding| binding.slot).collect()
    }

    /// Parameter values in placeholder order.
    pub fn params(&self) -> Vec<SqlValue> {
        self.bindings
            .iter()
            .map(|binding| binding.value.clone())
            .collect()
    }
}

/// Filter conditions, rendered in order and joined with `AND`.
#[derive(Debug)]
enum Clause<'a> {
    WithinBounds(&'a Rect<f64>),
    /// Category identifiers are typed integers and render as literals.
    CategoryIn(Vec<i64>),
    TagMatches {
        index: usize,
        pattern: &'a TagPattern,
    },
}

#[derive(Debug)]
struct QueryPlan<'a> {
    join_categories: bool,
    clauses: Vec<Clause<'a>>,
    limit: usize,
}

impl<'a> QueryPlan<'a> {
    fn from_query(query: &RectQuery<'a>) -> Self {
        let mut clauses = vec![Clause::WithinBounds(query.bounds)];
        if let Some(filter) = query.filter {
            clauses.push(Clause::CategoryIn(filter.accepted_ids().collect()));
        }
        clauses.extend(
            query
                .patterns
                .iter()
                .enumerate()
                .map(|(index, pattern)| Clause::TagMatches { index, pattern }),
        );
        Self {
            join_categories: query.filter.is_some(),
            clauses,
            limit: query.limit,
        }
    }

    fn render(&self) -> CompiledQuery {
        let mut binder = Binder::default();
        let mut sql = String::from(if self.join_categories {
            "SELECT DISTINCT poi_index.id, poi_index.lat, poi_index.lon FROM poi_index \
             JOIN poi_cmap ON poi_index.id = poi_cmap.id"
        } else {
            "SELECT poi_index.id, poi_index.lat, poi_index.lon FROM poi_index"
        });

        for (position, clause) in self.clauses.iter().enumerate() {
            sql.push_str(if position == 0 { " WHERE " } else { " AND " });
            render_clause(&mut sql, &mut binder, clause);
        }

        let limit = i64::try_from(self.limit)
            .ok()
            .filter(|limit| *limit > 0)
            .unwrap_or(UNLIMITED);
        let placeholder = binder.bind(BindSlot::Limit, limit.into());
        sql.push_str(&format!(" LIMIT {placeholder}"));

        CompiledQuery {
            sql,
            bindings: binder.bindings,
        }
    }
}

fn render_clause(sql: &mut String, binder: &mut Binder, clause: &Clause<'_>) {
    match clause {
        Clause::WithinBounds(bounds) => {
            let max_lat = binder.bind(BindSlot::MaxLatitude, bounds.max().y.into());
            let max_lon = binder.bind(BindSlot::MaxLongitude, bounds.max().x.into());
            let min_lat = binder.bind(BindSlot::MinLatitude, bounds.min().y.into());
            let min_lon = binder.bind(BindSlot::MinLongitude, bounds.min().x.into());
            sql.push_str(&format!(
                "poi_index.minLat <= {max_lat} AND poi_index.maxLat >= {min_lat} \
                 AND poi_index.minLon <= {max_lon} AND poi_index.maxLon >= {min_lon} \
                 AND poi_index.lat BETWEEN {min_lat} AND {max_lat} \
                 AND poi_index.lon BETWEEN {min_lon} AND {max_lon}"
            ));
        }
        Clause::CategoryIn(ids) => {
            let list = ids
                .iter()
                .map(i64::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(&format!("poi_cmap.category IN ({list})"));
        }
        Clause::TagMatches { index, pattern } => {
            let key = binder.bind(BindSlot::PatternKey(*index), pattern.key.as_str().into());
            let value = binder.bind(
                BindSlot::PatternValue(*index),
                pattern.value.as_str().into(),
            );
            sql.push_str(&format!(
                "EXISTS (SELECT 1 FROM poi_data \
                 JOIN poi_tagkeys ON poi_data.key = poi_tagkeys.id \
                 JOIN poi_tagvalues ON poi_data.value = poi_tagvalues.id \
                 WHERE poi_data.id = poi_index.id \
                 AND poi_tagkeys.key = {key} AND poi_tagvalues.value LIKE {value})"
            ));
        }
    }
}

/// Allocates numbered placeholders in bind order.
#[derive(Debug, Default)]
struct Binder {
    bindings: Vec<Binding>,
}

impl Binder {
    fn bind(&mut self, slot: BindSlot, value: SqlValue) -> String {
        self.bindings.push(Binding { slot, value });
        format!("?{}", self.bindings.len())
    }
}

/// Compile a bounding-box search into SQL and its parameters.
///
/// Without a filter no category restriction applies; an empty filter matches
/// nothing. Each tag pattern must match its own association row, so several
/// patterns narrow the result conjunctively.
///
/// # Examples
/// ```
/// use geo::{Coord, Rect};
/// use poidb_core::TagPattern;
/// use poidb_core::store::query::{BindSlot, RectQuery, compile_rect_query};
///
/// let bounds = Rect::new(Coord { x: 5.0, y: 5.0 }, Coord { x: 25.0, y: 25.0 });
/// let patterns = [TagPattern::new("amenity", "ca%")];
/// let compiled = compile_rect_query(&RectQuery {
///     bounds: &bounds,
///     filter: None,
///     patterns: &patterns,
///     limit: 10,
/// });
///
/// assert_eq!(
///     compiled.binding_order(),
///     vec![
///         BindSlot::MaxLatitude,
///         BindSlot::MaxLongitude,
///         BindSlot::MinLatitude,
///         BindSlot::MinLongitude,
///         BindSlot::PatternKey(0),
///         BindSlot::PatternValue(0),
///         BindSlot::Limit,
///     ]
/// );
/// assert!(compiled.sql().ends_with("LIMIT ?7"));
/// ```
pub fn compile_rect_query(query: &RectQuery<'_>) -> CompiledQuery {
    QueryPlan::from_query(query).render()
}

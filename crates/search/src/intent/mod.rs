//! Scenario intent parsing
//!
//! A prioritized-alternation matcher, not an NLP model: an ordered list of
//! rules is scanned linearly and the first rule that matches decides every
//! field. List order is the authoritative tie-break between overlapping
//! rules, so keep it explicit and debuggable - no generated parser.

use cityscope_common::models::ScenarioIntent;
use regex_lite::Regex;
use tracing::debug;

/// Rule patterns in priority order. Each captures a subset of the named
/// groups `action`, `feature`, `street`, `start`, `end`, `city`; other
/// groups document the grammar but do not populate the intent.
const RULES: &[&str] = &[
    // Pedestrianization corridors
    r"(?i)(?P<action>pedestrianiz\w+)\s+(?P<street>[A-Za-z0-9 .'-]+?)\s+from\s+(?P<start>[^,]+?)\s+to\s+(?P<end>[^,]+?)(?:\s+in\s+(?P<city>[^.]+))?$",
    r"(?i)add\s+(?P<feature>bike lane|bus lane)\s+(?:along|on)\s+(?P<street>[A-Za-z0-9 .'-]+?)(?:\s+in\s+(?P<city>[^.]+))?$",
    // Street closures
    r"(?i)close\s+(?P<street>[A-Za-z0-9 .'-]+?)\s+(?:between|from)\s+(?P<start>[^,]+?)\s+(?:and|to)\s+(?P<end>[^,]+?)(?:\s+in\s+(?P<city>[^.]+))?$",
    r"(?i)shut\s+down\s+(?P<street>[A-Za-z0-9 .'-]+?)\s+(?:between|from)\s+(?P<start>[^,]+?)\s+(?:and|to)\s+(?P<end>[^,]+?)(?:\s+in\s+(?P<city>[^.]+))?$",
    // New lanes/features
    r"(?i)install\s+(?P<feature>protected bike lane|bus rapid transit)\s+(?:on|along)\s+(?P<street>[A-Za-z0-9 .'-]+?)$",
    r"(?i)convert\s+(?P<street>[A-Za-z0-9 .'-]+?)\s+into\s+(?P<feature>shared street|bike boulevard)$",
    r"(?i)add\s+(?P<num>\d+)\s+way\s+(?P<feature>bike path|bus lane)\s+(?:on|along)\s+(?P<street>[A-Za-z0-9 .'-]+)$",
    r"(?i)create\s+(?P<feature>pedestrian plaza|parklet)\s+(?:at|on)\s+(?P<location>[A-Za-z0-9 .'-]+)$",
    // Speed limit changes
    r"(?i)reduce\s+speed\s+limit\s+(?:on|along)\s+(?P<street>[A-Za-z0-9 .'-]+?)\s+to\s+(?P<limit>\d+)\s*mph$",
    r"(?i)increase\s+speed\s+limit\s+(?:on|along)\s+(?P<street>[A-Za-z0-9 .'-]+?)\s+to\s+(?P<limit>\d+)\s*mph$",
    // Traffic direction changes
    r"(?i)make\s+(?P<street>[A-Za-z0-9 .'-]+?)\s+(?P<direction>one[- ]way|two[- ]way)$",
    r"(?i)change\s+traffic\s+flow\s+(?:on|along)\s+(?P<street>[A-Za-z0-9 .'-]+?)\s+to\s+(?P<direction>one[- ]way|two[- ]way)$",
    // Transit changes
    r"(?i)add\s+(?P<mode>subway station|train stop)\s+(?:at|near)\s+(?P<location>[A-Za-z0-9 .'-]+)$",
    r"(?i)remove\s+(?P<mode>bus stop|subway station)\s+(?:at|near)\s+(?P<location>[A-Za-z0-9 .'-]+)$",
    r"(?i)extend\s+(?P<mode>bus route|subway line)\s+(?P<name>[A-Za-z0-9 .'-]+?)\s+to\s+(?P<destination>[A-Za-z0-9 .'-]+)$",
    // Road expansions/reductions
    r"(?i)widen\s+(?P<street>[A-Za-z0-9 .'-]+?)\s+by\s+(?P<lanes>\d+)\s+lanes$",
    r"(?i)narrow\s+(?P<street>[A-Za-z0-9 .'-]+?)\s+by\s+(?P<lanes>\d+)\s+lanes$",
    r"(?i)reduce\s+(?P<street>[A-Za-z0-9 .'-]+?)\s+to\s+(?P<lanes>\d+)\s+lanes$",
    // Pedestrian/bike infrastructure
    r"(?i)build\s+(?P<feature>bike path|walking trail)\s+(?:on|along)\s+(?P<street>[A-Za-z0-9 .'-]+)$",
    r"(?i)connect\s+(?P<feature1>bike path|trail)\s+to\s+(?P<feature2>bike path|trail)\s+(?:via|through)\s+(?P<street>[A-Za-z0-9 .'-]+)$",
    // Parking changes
    r"(?i)remove\s+(?P<num>\d+)\s+parking\s+spaces\s+(?:on|along)\s+(?P<street>[A-Za-z0-9 .'-]+)$",
    r"(?i)add\s+(?P<num>\d+)\s+parking\s+spaces\s+(?:on|along)\s+(?P<street>[A-Za-z0-9 .'-]+)$",
    // Crosswalks/signals
    r"(?i)add\s+(?P<feature>crosswalk|pedestrian signal)\s+(?:at|on)\s+(?P<location>[A-Za-z0-9 .'-]+)$",
    r"(?i)remove\s+(?P<feature>crosswalk|pedestrian signal)\s+(?:at|on)\s+(?P<location>[A-Za-z0-9 .'-]+)$",
    // Environmental
    r"(?i)plant\s+(?P<num>\d+)\s+trees\s+(?:along|on)\s+(?P<street>[A-Za-z0-9 .'-]+)$",
    r"(?i)add\s+(?P<feature>green roof|rain garden)\s+(?:to|at)\s+(?P<location>[A-Za-z0-9 .'-]+)$",
    r"(?i)install\s+(?P<feature>solar panels|charging stations)\s+(?:along|on|at)\s+(?P<street>[A-Za-z0-9 .'-]+)$",
    // Bridges/tunnels
    r"(?i)close\s+(?P<feature>bridge|tunnel)\s+(?P<name>[A-Za-z0-9 .'-]+)$",
    r"(?i)open\s+(?P<feature>bridge|tunnel)\s+(?P<name>[A-Za-z0-9 .'-]+)$",
    // Tolling/congestion pricing
    r"(?i)introduce\s+(?P<feature>toll|congestion charge)\s+(?:on|for)\s+(?P<street>[A-Za-z0-9 .'-]+)$",
    r"(?i)remove\s+(?P<feature>toll|congestion charge)\s+(?:on|for)\s+(?P<street>[A-Za-z0-9 .'-]+)$",
    // Lighting/safety
    r"(?i)install\s+(?P<num>\d+)\s+streetlights\s+(?:on|along)\s+(?P<street>[A-Za-z0-9 .'-]+)$",
    r"(?i)remove\s+(?P<num>\d+)\s+streetlights\s+(?:on|along)\s+(?P<street>[A-Za-z0-9 .'-]+)$",
    // Lane conversions
    r"(?i)convert\s+(?P<num>\d+)\s+lanes\s+(?:on|along)\s+(?P<street>[A-Za-z0-9 .'-]+?)\s+to\s+(?P<feature>bike lanes|bus lanes|parking)$",
    r"(?i)repurpose\s+(?P<street>[A-Za-z0-9 .'-]+?)\s+lanes\s+for\s+(?P<feature>bike traffic|bus traffic)$",
    // Roundabouts/intersections
    r"(?i)add\s+(?P<feature>roundabout|traffic circle)\s+(?:at|on)\s+(?P<location>[A-Za-z0-9 .'-]+)$",
    r"(?i)remove\s+(?P<feature>roundabout|traffic circle)\s+(?:at|on)\s+(?P<location>[A-Za-z0-9 .'-]+)$",
    // Misc planning
    r"(?i)build\s+(?P<feature>pedestrian bridge|overpass)\s+(?:at|over)\s+(?P<street>[A-Za-z0-9 .'-]+)$",
    r"(?i)demolish\s+(?P<feature>overpass|bridge)\s+(?P<name>[A-Za-z0-9 .'-]+)$",
    r"(?i)restrict\s+truck\s+access\s+(?:on|along)\s+(?P<street>[A-Za-z0-9 .'-]+)$",
    r"(?i)allow\s+truck\s+access\s+(?:on|along)\s+(?P<street>[A-Za-z0-9 .'-]+)$",
    // Zoning/land use lookups
    r"(?i)current\s+(?P<subject>zoning|land use)\s+(?:rules|restrictions|regulations)\s+(?:for|in)\s+(?P<area>[^?]+)",
    r"(?i)(?:list|show)\s+(?P<type>zones|districts)\s+(?:in|for)\s+(?P<area>[^?]+)",
    r"(?i)what\s+(?:is|are)\s+(?P<area>[^?]+)\s+(?P<subject>zone classification|zone type)",
    // Inventory/status lookups
    r"(?i)(?:list|show)\s+(?P<feature>bike lanes|bus lanes|pedestrian zones)\s+(?:in|within)\s+(?P<area>[^?]+)",
    r"(?i)status\s+of\s+(?P<project>[^?]+)\s+(?:project|initiative)",
    r"(?i)where\s+(?:are|is)\s+(?P<feature>bike lanes|bus lanes|pedestrian plazas)\s+(?:in|within)\s+(?P<area>[^?]+)",
    r"(?i)(?:list|show)\s+(?P<type>projects|changes)\s+(?:in|for)\s+(?P<area>[^?]+)\s+since\s+(?P<year>\d{4})",
    r"(?i)(?:what|which)\s+(?P<feature>roads|streets)\s+were\s+(?P<action>closed|pedestrianized|modified)\s+in\s+(?P<year>\d{4})",
    r"(?i)(?:find|locate)\s+(?P<feature>[^?]+)\s+near\s+(?P<location>[^?]+)",
    r"(?i)(?:what|which)\s+(?P<feature>roads|zones)\s+are\s+adjacent\s+to\s+(?P<landmark>[^?]+)",
    r"(?i)(?:what|which)\s+(?P<subject>laws|policies|guidelines)\s+(?:apply to|govern)\s+(?P<topic>[^?]+)",
    r"(?i)(?:give me|list)\s+the\s+(?P<subject>rules|restrictions)\s+(?:about|for)\s+(?P<topic>[^?]+)",
];

/// Trim and collapse internal whitespace runs to single spaces
fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First-match-wins scenario query parser
pub struct IntentParser {
    rules: Vec<Regex>,
}

impl Default for IntentParser {
    fn default() -> Self {
        Self::new()
    }
}

impl IntentParser {
    pub fn new() -> Self {
        let rules = RULES
            .iter()
            .map(|pattern| Regex::new(pattern).expect("intent rule patterns are static"))
            .collect();
        Self { rules }
    }

    /// Parse a raw query into a structured intent.
    ///
    /// Rules are tried in list order and the first match decides every
    /// field; later rules are never evaluated. A `feature` capture
    /// overrides `action` with the feature's lower-cased value. Unmatched
    /// queries keep only the raw query and the default jurisdiction.
    pub fn parse(&self, raw_query: &str) -> ScenarioIntent {
        let q = normalize(raw_query);
        let mut intent = ScenarioIntent::unmatched(raw_query);

        for (idx, rule) in self.rules.iter().enumerate() {
            let Some(caps) = rule.captures(&q) else {
                continue;
            };
            debug!(rule = idx + 1, "Intent rule matched");

            let get = |name: &str| {
                caps.name(name)
                    .map(|m| normalize(m.as_str()))
                    .filter(|s| !s.is_empty())
            };

            if let Some(action) = get("action") {
                intent.action = Some(action.to_lowercase());
            }
            if let Some(feature) = get("feature") {
                let feature = feature.to_lowercase();
                intent.action = Some(feature.clone());
                intent.feature = Some(feature);
            }
            intent.primary_street = get("street");
            intent.from_cross = get("start");
            intent.to_cross = get("end");
            if let Some(city) = get("city") {
                intent.jurisdiction = city;
            }
            break;
        }

        debug!(
            action = ?intent.action,
            street = ?intent.primary_street,
            from = ?intent.from_cross,
            to = ?intent.to_cross,
            city = %intent.jurisdiction,
            "Query parsed"
        );
        intent
    }
}

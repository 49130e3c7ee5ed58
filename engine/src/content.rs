use std::collections::HashMap;

pub fn builtin_scenarios() -> HashMap<&'static str, &'static str> {
    HashMap::from([(
        "outpost_skirmish",
        include_str!("../content/scenarios/outpost_skirmish.json"),
    )])
}

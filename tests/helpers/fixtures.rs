//! A small model split over four fragments, in the exact layout the
//! serializer produces.
//!
//! ```text
//! model.aird ──semanticResources──▶ model.afm, model.capella
//! model.capella ──href──▶ frag/Part.capellafragment
//! frag/Part.capellafragment ──link──▶ model.capella
//! ```

use melody::exs::LINESEP;

pub const AIRD_PATH: &str = "model.aird";
pub const AFM_PATH: &str = "model.afm";
pub const CAPELLA_PATH: &str = "model.capella";
pub const FRAGMENT_PATH: &str = "frag/Part.capellafragment";

pub const AIRD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<viewpoint:DAnalysis xmlns:viewpoint="urn:sirius" uid="analysis">
  <semanticResources>model.afm</semanticResources>
  <semanticResources>model.capella</semanticResources>
  <diagram uid="d1" name="Overview">
    <target href="model.capella#f1"/>
  </diagram>
</viewpoint:DAnalysis>
"#;

pub const AFM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata:Metadata xmlns:xmi="http://www.omg.org/XMI"
    xmlns:metadata="urn:metadata"
    xmi:id="meta">
  <viewpointReferences xmi:id="vpr1" vpId="org.polarsys.capella.core.viewpoint"
      version="7.0.0"/>
</metadata:Metadata>
"#;

pub const CAPELLA: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<core:Model xmlns:core="urn:core" xmlns:la="urn:la"
    xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
    id="root"
    name="Model">
  <ownedFunctions xsi:type="la:Function" id="f1" name="Root function">
    <ownedFunctions xsi:type="la:Function" id="f2" name="Child"/>
  </ownedFunctions>
  <ownedExchanges xsi:type="la:Exchange" id="e1" source="#f1" target="#f2"/>
  <ownedParts id="p1" type="la:Component frag/Part.capellafragment#c1"/>
  <ownedFragments href="frag/Part.capellafragment#fragroot"/>
</core:Model>
"##;

pub const FRAGMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<core:Fragment xmlns:core="urn:core" xmlns:la="urn:la"
    xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
    id="fragroot">
  <ownedComponents xsi:type="la:Component" id="c1" name="Part">
    <ownedLinks id="l1" target="../model.capella#f1"/>
  </ownedComponents>
</core:Fragment>
"#;

/// Convert a fixture to the platform line terminator.
pub fn lines(text: &str) -> String {
    text.replace('\n', LINESEP)
}

/// All fixture files as `(path, content)` pairs.
pub fn model_files() -> Vec<(&'static str, String)> {
    vec![
        (AIRD_PATH, lines(AIRD)),
        (AFM_PATH, lines(AFM)),
        (CAPELLA_PATH, lines(CAPELLA)),
        (FRAGMENT_PATH, lines(FRAGMENT)),
    ]
}

//! XML Assembler
//!
//! Serializes bound components into a Caneco BT exchange document.
//!
//! ```text
//! ElectricalProject
//! ├── Description
//! ├── Contacts        Company CC00001, Person CP00001
//! ├── Products
//! │   ├── ProductSet  Product  PG#####   seed + ordered characteristics
//! │   └── ProductList Pack     PK#####   -> Product, one Instance PI#####
//! ├── Equipments      Equipment EQ#####  -> Pack, Device, Function
//! │                   Device    ED#####  -> Instance
//! └── Network         Function  EF#####  -> Equipment, Device
//! ```
//!
//! Root attributes and namespace declarations are written exactly as the
//! reference export carries them; the consuming tool compares them as text.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::binder::BoundComponent;
use crate::config::{FormatHeader, ProjectDescription};
use crate::core::CanecoError;
use crate::extractor::{KEY_POLES, KEY_POWER, KEY_RATING, KEY_REFERENCE, KEY_SECTION};
use crate::templates::ComponentKind;

pub const ROOT_ELEMENT: &str = "ElectricalProject";
pub const COMPANY_ID: &str = "CC00001";
pub const PERSON_ID: &str = "CP00001";

/// Seed type attribute used by every product definition.
const SEED_TYPE: &str = "RAPSODY";

/// Breaking capacity characteristic (kA).
const KEY_BREAKING_CAPACITY: &str = "PRT_ICC";

/// Writes one document per call; holds no state between calls.
pub struct DocumentAssembler<'a> {
    header: &'a FormatHeader,
    project: &'a ProjectDescription,
}

impl<'a> DocumentAssembler<'a> {
    pub fn new(header: &'a FormatHeader, project: &'a ProjectDescription) -> Self {
        Self { header, project }
    }

    /// Render the full document. Components are written in slice order.
    pub fn assemble(&self, components: &[BoundComponent]) -> Result<String, CanecoError> {
        let mut xml = XmlOut::new();

        xml.writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

        let root = BytesStart::new(ROOT_ELEMENT).with_attributes(root_attributes(self.header));
        xml.writer.write_event(Event::Start(root))?;

        self.write_description(&mut xml)?;
        self.write_contacts(&mut xml)?;
        self.write_products(&mut xml, components)?;
        self.write_equipments(&mut xml, components)?;
        self.write_network(&mut xml, components)?;

        xml.end(ROOT_ELEMENT)?;
        xml.finish()
    }

    fn write_description(&self, xml: &mut XmlOut) -> Result<(), CanecoError> {
        xml.start("Description")?;
        xml.text_element("Name", &self.project.name)?;
        xml.text_element("Number", &self.project.number)?;
        xml.optional_text_element("OrderNumber", &self.project.order_number)?;
        xml.text_element("StartDate", &self.project.start_date_text())?;
        xml.end("Description")
    }

    fn write_contacts(&self, xml: &mut XmlOut) -> Result<(), CanecoError> {
        let p = self.project;
        xml.start("Contacts")?;

        xml.start_with("Company", &[("id", COMPANY_ID)])?;
        xml.start("Address")?;
        xml.text_element("Street", &p.street)?;
        xml.text_element("PostalCode", &p.postal_code)?;
        xml.text_element("City", &p.city)?;
        xml.optional_text_element("State", &p.state)?;
        xml.text_element("Country", &p.country)?;
        xml.end("Address")?;
        write_phone(xml, &p.phone)?;
        xml.text_element("Name", &p.company_name)?;
        xml.end("Company")?;

        xml.start_with("Person", &[("id", PERSON_ID)])?;
        xml.text_element("LastName", &p.contact_last_name)?;
        write_phone(xml, &p.contact_phone)?;
        xml.text_element("Email", &p.contact_email)?;
        xml.empty("Company", &[("id", COMPANY_ID)])?;
        xml.end("Person")?;

        xml.end("Contacts")
    }

    fn write_products(
        &self,
        xml: &mut XmlOut,
        components: &[BoundComponent],
    ) -> Result<(), CanecoError> {
        xml.start("Products")?;

        xml.start("ProductSet")?;
        for component in components {
            write_product_definition(xml, component)?;
        }
        xml.end("ProductSet")?;

        xml.start("ProductList")?;
        for component in components {
            self.write_pack(xml, component)?;
        }
        xml.end("ProductList")?;

        xml.end("Products")
    }

    fn write_pack(&self, xml: &mut XmlOut, component: &BoundComponent) -> Result<(), CanecoError> {
        xml.start_with(
            "Pack",
            &[
                ("id", component.pack_id.as_str()),
                ("Descriptor", component.product_id.as_str()),
            ],
        )?;

        xml.start("Product")?;
        let element = component.kind.commercial_element();
        xml.start_with(
            element,
            &[("xmlns", self.header.namespaces.commercial_taxonomy.as_str())],
        )?;
        for (name, value) in commercial_fields(component) {
            xml.optional_text_element(name, &value)?;
        }
        xml.end(element)?;
        xml.end("Product")?;

        xml.start("Instances")?;
        xml.empty("Instance", &[("id", component.instance_id.as_str())])?;
        xml.end("Instances")?;

        xml.end("Pack")
    }

    fn write_equipments(
        &self,
        xml: &mut XmlOut,
        components: &[BoundComponent],
    ) -> Result<(), CanecoError> {
        xml.start("Equipments")?;

        for component in components {
            xml.start_with("Equipment", &[("id", component.equipment_id.as_str())])?;
            xml.empty("Commercial", &[("ProductPacks", component.pack_id.as_str())])?;
            xml.empty(
                "Electrical",
                &[
                    ("Devices", component.device_id.as_str()),
                    ("Functions", component.function_id.as_str()),
                ],
            )?;
            xml.start("Properties")?;
            xml.text_element("Name", component.display_name())?;
            xml.end("Properties")?;
            xml.end("Equipment")?;
        }

        let electrical = self.header.namespaces.electrical_taxonomy.as_str();
        for component in components {
            xml.start_with(
                "Device",
                &[
                    ("id", component.device_id.as_str()),
                    ("ProductInstance", component.instance_id.as_str()),
                ],
            )?;
            xml.empty(component.kind.device_element(), &[("xmlns", electrical)])?;
            xml.end("Device")?;
        }

        xml.end("Equipments")
    }

    fn write_network(
        &self,
        xml: &mut XmlOut,
        components: &[BoundComponent],
    ) -> Result<(), CanecoError> {
        let electrical = self.header.namespaces.electrical_taxonomy.as_str();
        xml.start("Network")?;

        for component in components {
            xml.start_with(
                "Function",
                &[
                    ("id", component.function_id.as_str()),
                    ("Equipment", component.equipment_id.as_str()),
                    ("Devices", component.device_id.as_str()),
                ],
            )?;
            xml.text_element("Name", component.display_name())?;
            let element = component.kind.function_element();
            if component.kind == ComponentKind::Cable {
                xml.start_with(element, &[("xmlns", electrical)])?;
                xml.text_element("Type", "Cable")?;
                xml.end(element)?;
            } else {
                xml.empty(element, &[("xmlns", electrical)])?;
            }
            xml.end("Function")?;
        }

        xml.end("Network")
    }
}

/// Root element attributes in document order.
pub fn root_attributes(header: &FormatHeader) -> Vec<(&'static str, &str)> {
    let ns = &header.namespaces;
    vec![
        ("xmlns:xsi", ns.xsi.as_str()),
        ("xmlns:xsd", ns.xsd.as_str()),
        ("formatVersion", header.format_version.as_str()),
        (
            "productRangeValuesVersion",
            header.product_range_values_version.as_str(),
        ),
        (
            "commercialTaxonomyVersion",
            header.commercial_taxonomy_version.as_str(),
        ),
        (
            "electricalTaxonomyVersion",
            header.electrical_taxonomy_version.as_str(),
        ),
        (
            "mechanicalTaxonomyVersion",
            header.mechanical_taxonomy_version.as_str(),
        ),
        ("xmlns", ns.default.as_str()),
    ]
}

/// Render `components` with the given header and project description.
pub fn assemble(
    components: &[BoundComponent],
    header: &FormatHeader,
    project: &ProjectDescription,
) -> Result<String, CanecoError> {
    DocumentAssembler::new(header, project).assemble(components)
}

fn write_phone(xml: &mut XmlOut, phone: &str) -> Result<(), CanecoError> {
    xml.start("PhoneNumbers")?;
    xml.start_with("Phone", &[("Kind", "main")])?;
    xml.text(phone)?;
    xml.end("Phone")?;
    xml.end("PhoneNumbers")
}

fn write_product_definition(xml: &mut XmlOut, component: &BoundComponent) -> Result<(), CanecoError> {
    xml.start_with("Product", &[("id", component.product_id.as_str())])?;
    xml.text_element("Name", &component.template_name)?;
    xml.empty(
        "Seed",
        &[
            ("Name", ""),
            ("Type", SEED_TYPE),
            ("GroupId", component.seed.group_id.as_str()),
            ("ItemId", component.seed.item_id.as_str()),
        ],
    )?;

    xml.start("Content")?;
    xml.start("Characteristics")?;
    for characteristic in &component.characteristics {
        xml.start("Characteristic")?;
        xml.empty("Name", &[])?;
        xml.text_element("Id", &characteristic.id)?;
        xml.start("SetValues")?;
        xml.start("Value")?;
        xml.empty("Name", &[])?;
        // Empty defaults are real values and keep an explicit element.
        xml.text_element("Id", &characteristic.value)?;
        xml.end("Value")?;
        xml.end("SetValues")?;
        xml.end("Characteristic")?;
    }
    xml.end("Characteristics")?;
    xml.end("Content")?;

    xml.end("Product")
}

/// Commercial-taxonomy fields of a Pack, derived from bound values.
fn commercial_fields(component: &BoundComponent) -> Vec<(&'static str, String)> {
    let value = |key: &str| component.value(key).unwrap_or("").to_string();
    let manufacturer = component.manufacturer.trim().to_string();

    match component.kind {
        ComponentKind::Breaker => {
            let reference = value(KEY_REFERENCE);
            let poles = value(KEY_POLES);
            vec![
                ("Manufacturer", manufacturer),
                ("Range", product_range(&reference).to_string()),
                ("Designation", reference),
                ("Rating", strip_zero_decimals(&value(KEY_RATING))),
                ("SwitchedPoleCount", switched_poles(&poles)),
                ("ProtectedPoleCount", protected_poles(&poles)),
                ("BreakingCapacity", value(KEY_BREAKING_CAPACITY)),
            ]
        }
        ComponentKind::Transformer => vec![
            ("Manufacturer", manufacturer),
            ("Designation", component.display_name().to_string()),
            ("RatedPower", strip_zero_decimals(&value(KEY_POWER))),
        ],
        ComponentKind::Busbar => vec![
            ("Manufacturer", manufacturer),
            ("Designation", component.display_name().to_string()),
            ("Rating", strip_zero_decimals(&value(KEY_RATING))),
        ],
        ComponentKind::Cable => vec![
            ("Manufacturer", manufacturer),
            ("Designation", value(KEY_REFERENCE)),
            ("CrossSection", value(KEY_SECTION)),
        ],
        ComponentKind::Load => vec![
            ("Manufacturer", manufacturer),
            ("Designation", component.display_name().to_string()),
            ("Power", strip_zero_decimals(&value(KEY_POWER))),
        ],
    }
}

fn product_range(reference: &str) -> &'static str {
    if reference.starts_with("NSX") {
        "NSX"
    } else if reference.starts_with("iDT") {
        "Acti9 iC60"
    } else {
        ""
    }
}

/// `630.00` -> `630`; other values unchanged.
fn strip_zero_decimals(value: &str) -> String {
    value.strip_suffix(".00").unwrap_or(value).to_string()
}

/// `4P3D` -> `4P`
fn switched_poles(poles: &str) -> String {
    poles.chars().take(2).collect()
}

/// `4P3D` -> `3`, `3P` -> `3`
fn protected_poles(poles: &str) -> String {
    let chars: Vec<char> = poles.chars().collect();
    match chars.iter().position(|&c| c == 'D') {
        Some(end) if end > 0 => chars[end - 1].to_string(),
        _ => chars.iter().take(1).collect(),
    }
}

/// Indented writer plus the few element shapes the document uses.
struct XmlOut {
    writer: Writer<Vec<u8>>,
}

impl XmlOut {
    fn new() -> Self {
        Self {
            writer: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    fn start(&mut self, name: &str) -> Result<(), CanecoError> {
        self.writer.write_event(Event::Start(BytesStart::new(name)))?;
        Ok(())
    }

    fn start_with(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), CanecoError> {
        let element = BytesStart::new(name).with_attributes(attributes.iter().copied());
        self.writer.write_event(Event::Start(element))?;
        Ok(())
    }

    fn end(&mut self, name: &str) -> Result<(), CanecoError> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    fn empty(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), CanecoError> {
        let element = BytesStart::new(name).with_attributes(attributes.iter().copied());
        self.writer.write_event(Event::Empty(element))?;
        Ok(())
    }

    fn text(&mut self, text: &str) -> Result<(), CanecoError> {
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        Ok(())
    }

    /// `<name>text</name>`, also when `text` is empty.
    fn text_element(&mut self, name: &str, text: &str) -> Result<(), CanecoError> {
        self.start(name)?;
        self.text(text)?;
        self.end(name)
    }

    /// `<name>text</name>`, or `<name/>` when `text` is empty.
    fn optional_text_element(&mut self, name: &str, text: &str) -> Result<(), CanecoError> {
        if text.is_empty() {
            self.empty(name, &[])
        } else {
            self.text_element(name, text)
        }
    }

    fn finish(self) -> Result<String, CanecoError> {
        String::from_utf8(self.writer.into_inner())
            .map_err(|e| CanecoError::Xml(format!("document is not UTF-8: {}", e)))
    }
}

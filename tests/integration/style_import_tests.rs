use ice_bundle::transform::{
    import_style, ImportStyleOptions, ImportStylePlugin, StyleOption, TransformContext,
    TransformPipeline,
};
use ice_bundle::utils::ConfigLoader;
use std::sync::Arc;

const PAGE: &str = r#"import React from 'react';
import { Button, DatePicker as Picker } from 'antd';
import type { ButtonProps } from 'antd';

export default function Home(props: ButtonProps) {
  return <Picker><Button {...props} /></Picker>;
}
"#;

#[test]
fn test_page_gets_style_imports() {
    let out = import_style(PAGE, &ImportStyleOptions::new("antd")).unwrap();

    assert!(out.code.contains(
        "import { Button, DatePicker as Picker } from 'antd';\nimport 'antd/es/button/style';\nimport 'antd/es/date-picker/style';\nimport type"
    ));
    assert_eq!(out.code.matches("/style';").count(), 2);
}

#[test]
fn test_custom_style_skips_empty_paths() {
    let options = ImportStyleOptions::new("antd").with_style(StyleOption::custom(|name| {
        (name != "button").then(|| format!("antd/dist/{}.css", name))
    }));
    let out = import_style(PAGE, &options).unwrap();

    assert!(!out.code.contains("button"));
    assert!(out.code.contains("import 'antd/dist/date-picker.css';"));
}

#[tokio::test]
async fn test_pipeline_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("ice.config.json"),
        r#"{ "importStyle": [
            { "libraryName": "antd", "kebabCase": false },
            { "libraryName": "react", "style": false }
        ] }"#,
    )
    .unwrap();
    let config = ConfigLoader::load_from_file(dir.path()).unwrap().unwrap();

    let mut pipeline = TransformPipeline::new();
    for entry in &config.import_style {
        pipeline.add_plugin(Arc::new(ImportStylePlugin::new(ImportStyleOptions::from(entry))));
    }

    let out = pipeline
        .transform(PAGE, "/app/src/pages/index.tsx", &TransformContext::default())
        .await
        .unwrap();
    assert!(out.code.contains("import 'antd/es/Button/style';\nimport 'antd/es/DatePicker/style';"));
    assert!(!out.code.contains("react/es"));

    let server = pipeline
        .transform(PAGE, "/app/src/pages/index.tsx", &TransformContext { is_server: true })
        .await
        .unwrap();
    assert_eq!(server.code, PAGE);
}

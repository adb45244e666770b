pub const CREATE_COORDINATE_SYSTEM_TABLE: &str = "CREATE TABLE epsg_coordinate_system (
        coord_ref_sys_code INTEGER NOT NULL PRIMARY KEY CHECK (coord_ref_sys_code > 0),
        coord_ref_sys_name TEXT NOT NULL,
        coord_ref_sys_kind TEXT NOT NULL CHECK (coord_ref_sys_kind IN ('geographic', 'projected')),
        authority TEXT NOT NULL DEFAULT 'EPSG',
        source_geogcrs_code INTEGER,
        dx DOUBLE,
        dy DOUBLE,
        dz DOUBLE,
        rx DOUBLE,
        ry DOUBLE,
        rz DOUBLE,
        ds DOUBLE,
        min_x DOUBLE,
        min_y DOUBLE,
        max_x DOUBLE,
        max_y DOUBLE
    );";

pub const CREATE_PROJECTION_PARAMETER_TABLE: &str = "CREATE TABLE epsg_projection_parameter (
        coord_ref_sys_code INTEGER NOT NULL,
        parameter_name TEXT NOT NULL,
        parameter_value DOUBLE NOT NULL,
        CONSTRAINT pk_epp PRIMARY KEY (coord_ref_sys_code, parameter_name),
        CONSTRAINT fk_epp_code FOREIGN KEY (coord_ref_sys_code) REFERENCES epsg_coordinate_system(coord_ref_sys_code)
    );";

pub const CREATE_OVERRIDE_TABLE: &str = "CREATE TABLE epsg_override (
        coord_ref_sys_code INTEGER NOT NULL PRIMARY KEY CHECK (coord_ref_sys_code > 0),
        coord_ref_sys_name TEXT,
        dx DOUBLE,
        dy DOUBLE,
        dz DOUBLE,
        rx DOUBLE,
        ry DOUBLE,
        rz DOUBLE,
        ds DOUBLE
    );";

pub const CREATE_OVERRIDE_PARAMETER_TABLE: &str = "CREATE TABLE epsg_override_parameter (
        coord_ref_sys_code INTEGER NOT NULL,
        parameter_name TEXT NOT NULL,
        parameter_value DOUBLE NOT NULL,
        CONSTRAINT pk_eop PRIMARY KEY (coord_ref_sys_code, parameter_name),
        CONSTRAINT fk_eop_code FOREIGN KEY (coord_ref_sys_code) REFERENCES epsg_override(coord_ref_sys_code)
    );";

pub const SELECT_COORDINATE_SYSTEMS: &str = "SELECT coord_ref_sys_code, coord_ref_sys_name, coord_ref_sys_kind,
        authority, source_geogcrs_code, dx, dy, dz, rx, ry, rz, ds, min_x, min_y, max_x, max_y
    FROM epsg_coordinate_system";

pub const SELECT_PROJECTION_PARAMETERS: &str =
    "SELECT coord_ref_sys_code, parameter_name, parameter_value FROM epsg_projection_parameter";

pub const SELECT_OVERRIDES: &str =
    "SELECT coord_ref_sys_code, coord_ref_sys_name, dx, dy, dz, rx, ry, rz, ds FROM epsg_override";

pub const SELECT_OVERRIDE_PARAMETERS: &str =
    "SELECT coord_ref_sys_code, parameter_name, parameter_value FROM epsg_override_parameter";
